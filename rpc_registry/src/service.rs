use descriptk::MessageType;

use zerror_core::ErrorCore;

use super::Error;

//////////////////////////////////////////// ServiceType ///////////////////////////////////////////

/// A reference to a service descriptor that is resolved only when it is needed, so that each
/// rpc can name the service that owns it.
#[derive(Clone, Copy)]
pub struct ServiceType {
    resolve: fn() -> &'static ServiceDescriptor,
}

impl ServiceType {
    pub const fn new(resolve: fn() -> &'static ServiceDescriptor) -> Self {
        Self { resolve }
    }

    pub fn descriptor(&self) -> &'static ServiceDescriptor {
        (self.resolve)()
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().display_name()
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &ServiceType) -> bool {
        std::ptr::eq(self.descriptor(), other.descriptor())
    }
}

impl Eq for ServiceType {}

impl std::fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "service<{}>", self.name())
    }
}

/////////////////////////////////////////// RpcDescriptor //////////////////////////////////////////

/// One method of a service.  `name` is how callers address it; `proto_name` is the name it has
/// on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcDescriptor {
    name: String,
    proto_name: String,
    request: MessageType,
    response: MessageType,
    service: ServiceType,
}

impl RpcDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proto_name(&self) -> &str {
        &self.proto_name
    }

    pub fn request_type(&self) -> MessageType {
        self.request
    }

    pub fn response_type(&self) -> MessageType {
        self.response
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }
}

///////////////////////////////////////// ServiceDescriptor ////////////////////////////////////////

/// The rpcs of one service, in declaration order.
#[derive(Debug)]
pub struct ServiceDescriptor {
    full_name: Option<String>,
    rpcs: Vec<RpcDescriptor>,
}

impl ServiceDescriptor {
    /// Start a service whose rpcs will point back at `owner`.
    pub fn builder(owner: ServiceType) -> ServiceBuilder {
        ServiceBuilder {
            owner,
            full_name: None,
            rpcs: Vec::new(),
        }
    }

    pub fn fully_qualified_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("anonymous")
    }

    pub fn rpcs(&self) -> &[RpcDescriptor] {
        &self.rpcs
    }

    /// Find an rpc by its name or by its proto name.
    pub fn rpc(&self, name: &str) -> Option<&RpcDescriptor> {
        self.rpcs
            .iter()
            .find(|rpc| rpc.name == name || rpc.proto_name == name)
    }

    /// The (request, response) types of the named rpc.
    pub fn types_for(&self, name: &str) -> Option<(MessageType, MessageType)> {
        self.rpc(name).map(|rpc| (rpc.request, rpc.response))
    }
}

////////////////////////////////////////// ServiceBuilder //////////////////////////////////////////

pub struct ServiceBuilder {
    owner: ServiceType,
    full_name: Option<String>,
    rpcs: Vec<RpcDescriptor>,
}

impl ServiceBuilder {
    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn rpc(
        mut self,
        name: impl Into<String>,
        proto_name: impl Into<String>,
        request: MessageType,
        response: MessageType,
    ) -> Self {
        self.rpcs.push(RpcDescriptor {
            name: name.into(),
            proto_name: proto_name.into(),
            request,
            response,
            service: self.owner,
        });
        self
    }

    /// Check that every rpc can be addressed unambiguously and freeze the service.
    pub fn build(self) -> Result<ServiceDescriptor, Error> {
        for (idx, rpc) in self.rpcs.iter().enumerate() {
            if rpc.name.is_empty() || rpc.proto_name.is_empty() {
                return Err(Error::InvalidSchema {
                    core: ErrorCore::default(),
                    what: format!("rpc #{} has an empty name", idx),
                });
            }
            for other in self.rpcs[..idx].iter() {
                let clash = [&rpc.name, &rpc.proto_name]
                    .into_iter()
                    .find(|n| **n == other.name || **n == other.proto_name);
                if let Some(clash) = clash {
                    return Err(Error::InvalidSchema {
                        core: ErrorCore::default(),
                        what: format!("rpc name {} is declared twice", clash),
                    });
                }
            }
        }
        Ok(ServiceDescriptor {
            full_name: self.full_name,
            rpcs: self.rpcs,
        })
    }
}

#[cfg(test)]
mod tests {
    use descriptk::{message_type, FieldKind, MessageDescriptor};

    use super::*;

    message_type! {
        fn ping() => MessageDescriptor::builder()
            .full_name("test.Ping")
            .optional("seq", 1, FieldKind::UInt64)
            .build()
    }

    message_type! {
        fn pong() => MessageDescriptor::builder()
            .full_name("test.Pong")
            .optional("seq", 1, FieldKind::UInt64)
            .build()
    }

    crate::service_type! {
        fn pinger() => ServiceDescriptor::builder(ServiceType::new(pinger))
            .full_name("test.Pinger")
            .rpc("ping", "Ping", MessageType::new(ping), MessageType::new(pong))
            .rpc("echo", "Echo", MessageType::new(ping), MessageType::new(ping))
            .build()
    }

    #[test]
    fn lookup() {
        let svc = pinger();
        assert_eq!(Some("test.Pinger"), svc.fully_qualified_name());
        let names: Vec<&str> = svc.rpcs().iter().map(RpcDescriptor::name).collect();
        assert_eq!(vec!["ping", "echo"], names);
        assert_eq!(svc.rpc("ping"), svc.rpc("Ping"));
        assert!(svc.rpc("pong").is_none());
        let (req, resp) = svc.types_for("Echo").unwrap();
        assert_eq!(MessageType::new(ping), req);
        assert_eq!(MessageType::new(ping), resp);
        assert_eq!(ServiceType::new(pinger), svc.rpcs()[1].service());
        assert_eq!("test.Pinger", svc.rpcs()[0].service().name());
    }

    #[test]
    fn duplicates() {
        let dup = ServiceDescriptor::builder(ServiceType::new(pinger))
            .rpc("ping", "Ping", MessageType::new(ping), MessageType::new(pong))
            .rpc("Ping", "PingAgain", MessageType::new(ping), MessageType::new(pong))
            .build();
        assert!(matches!(dup, Err(Error::InvalidSchema { .. })));
        let empty = ServiceDescriptor::builder(ServiceType::new(pinger))
            .rpc("", "Ping", MessageType::new(ping), MessageType::new(pong))
            .build();
        assert!(matches!(empty, Err(Error::InvalidSchema { .. })));
        // an rpc may share its own name with its proto name
        assert!(ServiceDescriptor::builder(ServiceType::new(pinger))
            .rpc("Ping", "Ping", MessageType::new(ping), MessageType::new(pong))
            .build()
            .is_ok());
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use descriptk::{Catalog, Message, Published, Value};

use zerror::Z;

use zerror_core::ErrorCore;

use super::{Error, RpcDescriptor, ServiceDescriptor};
use super::{
    CALL, CONVERSION_ERROR, FIND, FIND_MISS, HANDLER_ERROR, HANDLER_REGISTERED, REGISTER_IGNORED,
    REQUEST_TYPE_ERROR, SERVICE_DEFINED, UNKNOWN_METHOD,
};

////////////////////////////////////////////// Handler /////////////////////////////////////////////

/// Handler implements the rpcs of one service.  Requests arrive as a [Value::Map] of the request
/// message; the returned value must be a map (or message) of the rpc's response type.
pub trait Handler {
    fn call(&self, rpc: &RpcDescriptor, request: Value) -> Result<Value, Error>;
}

impl<F: Fn(&RpcDescriptor, Value) -> Result<Value, Error>> Handler for F {
    fn call(&self, rpc: &RpcDescriptor, request: Value) -> Result<Value, Error> {
        self(rpc, request)
    }
}

/// Creates a fresh handler for each [ServiceRegistry::find].  A factory that returns None leaves
/// the service unbound.
pub type HandlerFactory = Arc<dyn Fn() -> Option<Box<dyn Handler>> + Send + Sync>;

/// Wrap a constructor in a [HandlerFactory].
pub fn handler_factory<H: Handler + 'static>(
    make: impl Fn() -> H + Send + Sync + 'static,
) -> HandlerFactory {
    Arc::new(move || Some(Box::new(make()) as Box<dyn Handler>))
}

////////////////////////////////////////////// Service /////////////////////////////////////////////

/// A service descriptor bound to a live handler.
pub struct Service {
    descriptor: &'static ServiceDescriptor,
    handler: Option<Box<dyn Handler>>,
}

impl Service {
    pub fn descriptor(&self) -> &'static ServiceDescriptor {
        self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.display_name()
    }

    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }

    /// Call `method` with `request`.  The request must be an instance of the rpc's request type;
    /// the handler's answer is converted to the rpc's response type.  Any failure the handler
    /// reports comes back as [Error::HandlerError].
    pub fn call(&self, method: &str, request: &Message) -> Result<Message, Error> {
        CALL.click();
        let rpc = match self.descriptor.rpc(method) {
            Some(rpc) => rpc,
            None => {
                UNKNOWN_METHOD.click();
                return Err(Error::UnknownMethod {
                    core: ErrorCore::default(),
                    service: self.name().to_string(),
                    method: method.to_string(),
                });
            }
        };
        let handler = match &self.handler {
            Some(handler) => handler,
            None => {
                HANDLER_ERROR.click();
                return Err(Error::HandlerError {
                    core: ErrorCore::default(),
                    what: format!("no handler bound for {}", self.name()),
                }
                .with_token("rpc", rpc.name()));
            }
        };
        if !rpc.request_type().is_instance(request) {
            REQUEST_TYPE_ERROR.click();
            return Err(Error::TypeError {
                core: ErrorCore::default(),
                expected: rpc.request_type().name().to_string(),
                got: request.descriptor().display_name().to_string(),
            }
            .with_token("rpc", rpc.name()));
        }
        let response = match handler.call(rpc, Value::Map(request.to_hash())) {
            Ok(response) => response,
            Err(err) => {
                HANDLER_ERROR.click();
                return Err(err.handler_failure().with_token("rpc", rpc.name()));
            }
        };
        Message::from_value(rpc.response_type().descriptor(), response).map_err(|err| {
            CONVERSION_ERROR.click();
            Error::Conversion {
                core: ErrorCore::default(),
                err,
                context: format!("response of {}.{}", self.name(), rpc.name()),
            }
        })
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name())
            .field("bound", &self.is_bound())
            .finish()
    }
}

////////////////////////////////////////// ServiceRegistry /////////////////////////////////////////

/// ServiceRegistry maps fully-qualified service names to their descriptors and handler factories.
///
/// Both maps are published snapshots:  a registration builds a new map from the old one and swaps
/// it in, so lookups see either the old map or the new one and never wait on a writer.
pub struct ServiceRegistry {
    descriptors: Catalog<ServiceDescriptor>,
    handlers: Published<BTreeMap<String, HandlerFactory>>,
}

static GLOBAL: ServiceRegistry = ServiceRegistry::new();

impl ServiceRegistry {
    pub const fn new() -> Self {
        Self {
            descriptors: Catalog::new(),
            handlers: Published::new(),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static ServiceRegistry {
        &GLOBAL
    }

    /// Make `descriptor` findable by its fully-qualified name.  Returns false for an anonymous
    /// service or a name that is already defined.
    pub fn define(&self, descriptor: &'static ServiceDescriptor) -> bool {
        let Some(name) = descriptor.fully_qualified_name() else {
            return false;
        };
        let defined = self.descriptors.insert(name, descriptor);
        if defined {
            SERVICE_DEFINED.click();
        }
        defined
    }

    /// Bind `factory` to the service `name`, replacing any earlier binding.  Nothing happens when
    /// either is absent.
    pub fn register(&self, name: Option<&str>, factory: Option<HandlerFactory>) -> bool {
        let (Some(name), Some(factory)) = (name, factory) else {
            REGISTER_IGNORED.click();
            return false;
        };
        self.handlers.publish(|handlers| {
            handlers.insert(name.to_string(), factory);
        });
        HANDLER_REGISTERED.click();
        true
    }

    /// The named service bound to a fresh handler, or None if no such service is defined.
    pub fn find(&self, name: &str) -> Option<Service> {
        let Some(descriptor) = self.descriptors.get(name) else {
            FIND_MISS.click();
            return None;
        };
        FIND.click();
        let handler = self
            .handlers
            .load()
            .get(name)
            .and_then(|factory| factory());
        Some(Service {
            descriptor,
            handler,
        })
    }

    pub fn descriptor(&self, name: &str) -> Option<&'static ServiceDescriptor> {
        self.descriptors.get(name)
    }

    /// Names that have a handler factory, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        self.handlers.load().keys().cloned().collect()
    }

    pub fn number_of_registered_services(&self) -> usize {
        self.handlers.load().len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

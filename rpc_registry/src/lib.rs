//! rpc_registry binds service descriptors to handlers and dispatches calls between them.
//!
//! A [ServiceDescriptor] lists the rpcs of one service along with the message types each takes
//! and returns.  A [ServiceRegistry] maps fully-qualified service names to handler factories.
//! [ServiceRegistry::find] pairs the two into a [Service] whose [Service::call] checks the
//! request's type, hands the request to the handler as a map, and converts what comes back into
//! the declared response type.
//!
//! There is no transport here.  Bytes in and bytes out belong to whatever carries the call.

use std::fmt::Debug;

use biometrics::{Collector, Counter};

use zerror::Z;

use zerror_core::ErrorCore;

pub mod registry;
pub mod service;

pub use registry::{handler_factory, Handler, HandlerFactory, Service, ServiceRegistry};
pub use service::{RpcDescriptor, ServiceBuilder, ServiceDescriptor, ServiceType};

///////////////////////////////////////////// biometrics ///////////////////////////////////////////

static SERVICE_DEFINED: Counter = Counter::new("rpc_registry.service_defined");
static HANDLER_REGISTERED: Counter = Counter::new("rpc_registry.handler_registered");
static REGISTER_IGNORED: Counter = Counter::new("rpc_registry.register_ignored");
static FIND: Counter = Counter::new("rpc_registry.find");
static FIND_MISS: Counter = Counter::new("rpc_registry.find_miss");
static CALL: Counter = Counter::new("rpc_registry.call");
static UNKNOWN_METHOD: Counter = Counter::new("rpc_registry.unknown_method");
static REQUEST_TYPE_ERROR: Counter = Counter::new("rpc_registry.request_type_error");
static HANDLER_ERROR: Counter = Counter::new("rpc_registry.handler_error");
static CONVERSION_ERROR: Counter = Counter::new("rpc_registry.conversion_error");

pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&SERVICE_DEFINED);
    collector.register_counter(&HANDLER_REGISTERED);
    collector.register_counter(&REGISTER_IGNORED);
    collector.register_counter(&FIND);
    collector.register_counter(&FIND_MISS);
    collector.register_counter(&CALL);
    collector.register_counter(&UNKNOWN_METHOD);
    collector.register_counter(&REQUEST_TYPE_ERROR);
    collector.register_counter(&HANDLER_ERROR);
    collector.register_counter(&CONVERSION_ERROR);
    descriptk::register_biometrics(collector);
}

/////////////////////////////////////////////// Error //////////////////////////////////////////////

#[derive(Clone, Debug)]
pub enum Error {
    /// TypeError indicates a request that is not an instance of the rpc's request type.
    TypeError {
        core: ErrorCore,
        expected: String,
        got: String,
    },
    /// HandlerError indicates a missing handler or a handler that failed.
    HandlerError { core: ErrorCore, what: String },
    /// UnknownMethod indicates a method the service does not declare.
    UnknownMethod {
        core: ErrorCore,
        service: String,
        method: String,
    },
    /// Conversion wraps a message-runtime failure, most often a handler response that does not
    /// fit the declared response type.
    Conversion {
        core: ErrorCore,
        err: descriptk::Error,
        context: String,
    },
    /// InvalidSchema indicates a service descriptor that cannot be built.
    InvalidSchema { core: ErrorCore, what: String },
}

impl Error {
    fn core(&self) -> &ErrorCore {
        match self {
            Error::TypeError { core, .. } => core,
            Error::HandlerError { core, .. } => core,
            Error::UnknownMethod { core, .. } => core,
            Error::Conversion { core, .. } => core,
            Error::InvalidSchema { core, .. } => core,
        }
    }

    fn core_mut(&mut self) -> &mut ErrorCore {
        match self {
            Error::TypeError { core, .. } => core,
            Error::HandlerError { core, .. } => core,
            Error::UnknownMethod { core, .. } => core,
            Error::Conversion { core, .. } => core,
            Error::InvalidSchema { core, .. } => core,
        }
    }

    /// Report a failure that happened inside a handler.  Anything the handler returned that is not
    /// already a [Error::HandlerError] becomes one, keeping its message and context.
    pub fn handler_failure(self) -> Self {
        match self {
            Error::HandlerError { .. } => self,
            err => Error::HandlerError {
                core: err.core().clone(),
                what: err.to_string(),
            },
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::TypeError {
                core: _,
                expected,
                got,
            } => {
                write!(f, "type error: expected {}, got {}", expected, got)
            }
            Error::HandlerError { core: _, what } => write!(f, "handler error: {}", what),
            Error::UnknownMethod {
                core: _,
                service,
                method,
            } => {
                write!(f, "unknown method {} on service {}", method, service)
            }
            Error::Conversion {
                core: _,
                err,
                context,
            } => {
                write!(f, "conversion error in {}: {}", context, err)
            }
            Error::InvalidSchema { core: _, what } => {
                write!(f, "invalid service schema: {}", what)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<descriptk::Error> for Error {
    fn from(err: descriptk::Error) -> Error {
        Error::Conversion {
            core: ErrorCore::default(),
            err,
            context: "descriptk error".to_string(),
        }
    }
}

impl Z for Error {
    type Error = Self;

    fn long_form(&self) -> String {
        format!("{}\n", self) + &self.core().long_form()
    }

    fn with_token(mut self, identifier: &str, value: &str) -> Self::Error {
        self.set_token(identifier, value);
        self
    }

    fn set_token(&mut self, identifier: &str, value: &str) {
        self.core_mut().set_token(identifier, value);
    }

    fn with_url(mut self, identifier: &str, url: &str) -> Self::Error {
        self.set_url(identifier, url);
        self
    }

    fn set_url(&mut self, identifier: &str, url: &str) {
        self.core_mut().set_url(identifier, url);
    }

    fn with_variable<X: Debug>(mut self, variable: &str, x: X) -> Self::Error {
        self.set_variable(variable, x);
        self
    }

    fn set_variable<X: Debug>(&mut self, variable: &str, x: X) {
        self.core_mut().set_variable(variable, x);
    }
}

////////////////////////////////////////////// macros //////////////////////////////////////////////

/// Declare a function returning a `&'static ServiceDescriptor` that is built on first use.
///
/// The builder must not resolve the service's own [ServiceType]; it is still being built.
///
/// # Panics
///
/// When the builder returns an error.
#[macro_export]
macro_rules! service_type {
    ($vis:vis fn $name:ident() => $build:expr) => {
        $vis fn $name() -> &'static $crate::ServiceDescriptor {
            static DESCRIPTOR: ::std::sync::OnceLock<$crate::ServiceDescriptor> =
                ::std::sync::OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                let built: ::std::result::Result<$crate::ServiceDescriptor, $crate::Error> = $build;
                match built {
                    Ok(descriptor) => descriptor,
                    Err(err) => panic!("invalid service {}: {}", stringify!($name), err),
                }
            })
        }
    };
}

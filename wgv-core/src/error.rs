use std::{error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

/// Which error scope filter an error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorType {
    Validation,
    OutOfMemory,
    Internal,
    /// Errors caused by a lost device. They are never handed to error scopes
    /// or to the uncaptured-error handler.
    DeviceLost,
}

impl ErrorType {
    fn filter(self) -> Option<wgt::ErrorFilter> {
        match self {
            Self::Validation => Some(wgt::ErrorFilter::Validation),
            Self::OutOfMemory => Some(wgt::ErrorFilter::OutOfMemory),
            Self::Internal => Some(wgt::ErrorFilter::Internal),
            Self::DeviceLost => None,
        }
    }
}

/// Classifies an error for the device error sink.
pub trait WebGpuError: StdError + 'static {
    fn webgpu_error_type(&self) -> ErrorType;
}

/// An error wrapped with the name of the entry point that produced it.
#[derive(Debug)]
pub struct ContextError {
    pub fn_ident: &'static str,
    pub source: Box<dyn StdError + Send + Sync + 'static>,
    pub label: String,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In {}", self.fn_ident)?;
        if !self.label.is_empty() {
            write!(f, ", label = '{}'", self.label)?;
        }
        Ok(())
    }
}

impl StdError for ContextError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

fn format_error_line(err: &dyn fmt::Display) -> String {
    format!("    {err}\n")
}

/// Formats an error and its whole source chain, one cause per line.
pub fn format_error(err: &(dyn StdError + 'static)) -> String {
    let mut err_descs = vec![format_error_line(err)];

    let mut source_opt = err.source();
    while let Some(source) = source_opt {
        err_descs.push(format_error_line(source));
        source_opt = source.source();
    }

    format!("Validation Error\n\nCaused by:\n{}", err_descs.join(""))
}

/// An error delivered to error scopes and to the uncaptured-error handler.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Out of Memory")]
    OutOfMemory {
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
    #[error("{description}")]
    Validation {
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
        description: String,
    },
    #[error("{description}")]
    Internal {
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
        description: String,
    },
}

impl Error {
    pub fn error_type(&self) -> ErrorType {
        match *self {
            Self::OutOfMemory { .. } => ErrorType::OutOfMemory,
            Self::Validation { .. } => ErrorType::Validation,
            Self::Internal { .. } => ErrorType::Internal,
        }
    }

    /// The formatted description, including the source chain.
    pub fn description(&self) -> String {
        match *self {
            Self::OutOfMemory { ref source } => format_error(source.as_ref()),
            Self::Validation {
                ref description, ..
            }
            | Self::Internal {
                ref description, ..
            } => description.clone(),
        }
    }
}

/// Called with every error no error scope captured.
pub type UncapturedErrorHandler = Arc<dyn Fn(Error) + Send + Sync + 'static>;

#[derive(Debug)]
struct ErrorScope {
    error: Option<Error>,
    filter: wgt::ErrorFilter,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum PopErrorScopeError {
    #[error("There is no error scope to pop")]
    EmptyStack,
}

/// Per-device destination of every reported error.
pub(crate) struct ErrorSink {
    scopes: Vec<ErrorScope>,
    uncaptured_handler: Option<UncapturedErrorHandler>,
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSink")
            .field("scopes", &self.scopes)
            .field("uncaptured_handler", &self.uncaptured_handler.is_some())
            .finish()
    }
}

/// An error nobody captured, to be delivered once the sink lock is released.
pub(crate) struct Uncaptured {
    handler: Option<UncapturedErrorHandler>,
    error: Error,
}

impl Uncaptured {
    pub(crate) fn deliver(self) {
        match self.handler {
            Some(handler) => handler(self.error),
            None => log::error!("{}", self.error.description()),
        }
    }
}

impl ErrorSink {
    pub(crate) fn new() -> Self {
        Self {
            scopes: Vec::new(),
            uncaptured_handler: None,
        }
    }

    pub(crate) fn push_scope(&mut self, filter: wgt::ErrorFilter) {
        self.scopes.push(ErrorScope {
            error: None,
            filter,
        });
    }

    pub(crate) fn pop_scope(&mut self) -> Result<Option<Error>, PopErrorScopeError> {
        self.scopes
            .pop()
            .map(|scope| scope.error)
            .ok_or(PopErrorScopeError::EmptyStack)
    }

    pub(crate) fn set_uncaptured_handler(&mut self, handler: Option<UncapturedErrorHandler>) {
        self.uncaptured_handler = handler;
    }

    /// Hands the error to the innermost matching scope.
    ///
    /// Only the first error of a scope is kept. If no scope matches, the
    /// error is returned with the handler so the caller can deliver it
    /// after releasing the sink.
    #[must_use]
    pub(crate) fn handle_error(&mut self, error: Error) -> Option<Uncaptured> {
        let filter = error.error_type().filter()?;
        match self
            .scopes
            .iter_mut()
            .rev()
            .find(|scope| scope.filter == filter)
        {
            Some(scope) => {
                if scope.error.is_none() {
                    scope.error = Some(error);
                }
                None
            }
            None => Some(Uncaptured {
                handler: self.uncaptured_handler.clone(),
                error,
            }),
        }
    }
}

/// Wraps `cause` into the public [`Error`] the sink routes.
///
/// Returns `None` for device-loss errors.
pub(crate) fn make_error<E>(fn_ident: &'static str, label: String, cause: E) -> Option<Error>
where
    E: WebGpuError + Send + Sync,
{
    let error_type = cause.webgpu_error_type();
    let source: Box<dyn StdError + Send + Sync + 'static> = Box::new(ContextError {
        fn_ident,
        source: Box::new(cause),
        label,
    });
    match error_type {
        ErrorType::DeviceLost => None,
        ErrorType::OutOfMemory => Some(Error::OutOfMemory { source }),
        ErrorType::Internal => Some(Error::Internal {
            description: format_error(source.as_ref()),
            source,
        }),
        ErrorType::Validation => Some(Error::Validation {
            description: format_error(source.as_ref()),
            source,
        }),
    }
}

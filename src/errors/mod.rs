mod accounts_error;
mod client_error;
mod http_error;
mod mcp_error;
mod token_error;
mod tool_error;

pub use accounts_error::AccountsError;
pub use client_error::{ClientError, ErrorKind, OperationContext, OperationError};
pub use http_error::{BoxError, HttpError, HttpErrorKind, TransportError};
pub use mcp_error::{ErrorCode, McpError};
pub use token_error::TokenError;
pub use tool_error::{ToolError, ToolErrorKind};

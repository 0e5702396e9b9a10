//! Structured errors for the shellcache MCP server.
//!
//! Worker and storage failures arrive as `shellcache_core::Error` and carry
//! their own codes; these cover what only the tool layer can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the shellcache MCP server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty method, nothing to delete).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::OutputFailed(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let err: McpError = ToolError::InvalidInput("method is empty".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "INVALID_INPUT: method is empty");

        let err: McpError = ToolError::OutputFailed("bad json".into()).into();
        assert_eq!(err.code, ErrorCode(-32603));
    }
}

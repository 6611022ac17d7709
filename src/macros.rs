// Copyright (C) 2025 Nuwaira
// All Rights Reserved.
//
// NOTICE: All information contained herein is, and remains
// the property of Nuwaira.
// The intellectual and technical concepts contained
// herein are proprietary to Nuwaira
// and are protected by trade secret or copyright law.
// Dissemination of this information or reproduction of this material
// is strictly forbidden unless prior written permission is obtained
// from Nuwaira.

/// Return early from a tool function with a successful text result.
macro_rules! mcp_return {
    ($text:expr) => {
        return Ok(rmcp::model::CallToolResult::success(vec![
            rmcp::model::Content::text($text),
        ]))
    };
}

/// Return early from a tool function with an error result that the client
/// can read, instead of failing the whole request.
macro_rules! mcp_return_err {
    ($err:expr) => {
        return Ok(rmcp::model::CallToolResult::error(vec![
            rmcp::model::Content::text($crate::error::DbError::to_json_string(&$err)),
        ]))
    };
}

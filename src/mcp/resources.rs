use crate::errors::{ErrorCode, McpError};
use serde_json::Value;

pub const SCHEME: &str = "restcheck";

struct ResourceDef {
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

const RESOURCES: &[ResourceDef] = &[
    ResourceDef {
        slug: "examples",
        name: "REST API Usage Examples",
        description: "Detailed examples of using the endpoint testing tool",
        content: include_str!("../../docs/examples.md"),
    },
    ResourceDef {
        slug: "response-format",
        name: "Response Format Documentation",
        description: "Documentation of the response format and structure",
        content: include_str!("../../docs/response-format.md"),
    },
    ResourceDef {
        slug: "config",
        name: "Configuration Documentation",
        description: "Documentation of all configuration options and how to use them",
        content: include_str!("../../docs/config.md"),
    },
];

pub fn list_resources() -> Value {
    let resources: Vec<Value> = RESOURCES
        .iter()
        .map(|resource| {
            serde_json::json!({
                "uri": format!("{}://{}", SCHEME, resource.slug),
                "name": resource.name,
                "description": resource.description,
                "mimeType": "text/markdown",
            })
        })
        .collect();
    serde_json::json!({ "resources": resources })
}

pub fn read_resource(uri: &str) -> Result<Value, McpError> {
    let prefix = format!("{}://", SCHEME);
    let slug = uri.strip_prefix(&prefix).ok_or_else(|| {
        McpError::new(
            ErrorCode::InvalidRequest,
            format!("Invalid resource URI format: {}", uri),
        )
    })?;
    let resource = RESOURCES
        .iter()
        .find(|resource| resource.slug == slug)
        .ok_or_else(|| {
            McpError::new(
                ErrorCode::InvalidRequest,
                format!("Resource not found: {}", slug),
            )
        })?;
    Ok(serde_json::json!({
        "contents": [{
            "uri": uri,
            "mimeType": "text/markdown",
            "text": resource.content,
        }]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_all_three_resources() {
        let listed = list_resources();
        assert_eq!(listed["resources"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn reads_known_resource_by_uri() {
        let read = read_resource("restcheck://config").unwrap();
        assert_eq!(read["contents"][0]["mimeType"], "text/markdown");
    }

    #[test]
    fn rejects_unknown_uri() {
        assert!(read_resource("restcheck://missing").is_err());
        assert!(read_resource("other://config").is_err());
    }
}

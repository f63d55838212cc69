use std::collections::BTreeSet;
use std::path::Path;

use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use crate::analysis::routes::{RouteFile, scan_routes_dir};
use crate::error::AppError;

pub const SWAGGER_FILE: &str = "swagger.json";

#[derive(Debug, Clone)]
pub struct SwaggerOptions {
    pub title: String,
    pub version: String,
    pub server_url: String,
}

impl Default for SwaggerOptions {
    fn default() -> Self {
        Self {
            title: "Kindergarten Management API".to_string(),
            version: "1.0.0".to_string(),
            server_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwaggerDocument {
    pub spec: Value,
    pub endpoints: usize,
    pub duplicates: usize,
    pub tags: usize,
}

pub fn build_openapi(route_files: &[RouteFile], options: &SwaggerOptions) -> SwaggerDocument {
    let mut paths: Map<String, Value> = Map::new();
    let mut endpoints = 0;
    let mut duplicates = 0;

    let mut tags: Vec<Value> = Vec::new();
    let mut tag_names: BTreeSet<String> = BTreeSet::new();
    for tag in route_files.iter().flat_map(|f| f.tags.iter()) {
        if tag_names.insert(tag.name.clone()) {
            tags.push(json!({
                "name": tag.name,
                "description": tag.description.clone().unwrap_or_default(),
            }));
        }
    }

    for file in route_files {
        for endpoint in &file.documented {
            let method = endpoint.method.to_lowercase();
            let item = paths
                .entry(endpoint.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            let Some(item) = item.as_object_mut() else {
                continue;
            };

            if item.contains_key(&method) {
                warn!(
                    "Duplicate documentation for {} {} in {}:{}",
                    endpoint.method,
                    endpoint.path,
                    file.file.display(),
                    endpoint.line
                );
                duplicates += 1;
                continue;
            }

            let mut operation = json!({
                "summary": endpoint.summary.clone().unwrap_or_default(),
                "tags": endpoint.tags,
                "responses": { "200": { "description": "Success" } },
            });
            if let Some(description) = &endpoint.description {
                operation["description"] = json!(description);
            }
            if endpoint.secured {
                operation["security"] = json!([{ "bearerAuth": [] }]);
            }
            item.insert(method, operation);
            endpoints += 1;

            for tag in &endpoint.tags {
                if tag_names.insert(tag.clone()) {
                    tags.push(json!({ "name": tag }));
                }
            }
        }
    }

    let tag_count = tags.len();
    let spec = json!({
        "openapi": "3.0.0",
        "info": {
            "title": options.title,
            "version": options.version,
            "description": "Generated from @swagger annotations in the route files",
        },
        "servers": [{ "url": options.server_url }],
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            }
        },
        "tags": tags,
        "paths": paths,
    });

    SwaggerDocument {
        spec,
        endpoints,
        duplicates,
        tags: tag_count,
    }
}

#[instrument(skip(options))]
pub fn generate_swagger(routes_dir: &Path, options: &SwaggerOptions) -> Result<SwaggerDocument, AppError> {
    let route_files = scan_routes_dir(routes_dir)?;
    let document = build_openapi(&route_files, options);

    info!(
        files = route_files.len(),
        endpoints = document.endpoints,
        duplicates = document.duplicates,
        "OpenAPI document built"
    );
    Ok(document)
}

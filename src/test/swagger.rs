#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use crate::analysis::routes::scan_route_source;
    use crate::error::AppError;
    use crate::swagger::{SwaggerOptions, build_openapi, generate_swagger};

    const CLASS_ROUTES: &str = r#"
/**
 * @swagger
 * tags:
 *   - name: Classes
 *     description: Class management
 */

/**
 * @swagger
 * /api/classes:
 *   get:
 *     summary: List classes
 *     description: Classes visible to the caller
 *     tags: [Classes]
 *     security:
 *       - bearerAuth: []
 *     responses:
 *       200:
 *         description: OK
 */
router.get('/', listClasses);

/**
 * @swagger
 * /api/classes/{id}:
 *   get:
 *     summary: Class detail
 *     tags: [Classes, Reports]
 */
router.get('/:id', getClass);
"#;

    const LEGACY_ROUTES: &str = r#"
/**
 * @swagger
 * /api/classes:
 *   get:
 *     summary: Legacy class list
 */
router.get('/classes', legacyList);
"#;

    #[test]
    fn test_first_documentation_wins_and_duplicates_are_counted() {
        let files = vec![
            scan_route_source(Path::new("classes.ts"), CLASS_ROUTES),
            scan_route_source(Path::new("legacy.ts"), LEGACY_ROUTES),
        ];

        let document = build_openapi(&files, &SwaggerOptions::default());

        assert_eq!(document.endpoints, 2);
        assert_eq!(document.duplicates, 1);
        assert_eq!(
            document.spec["paths"]["/api/classes"]["get"]["summary"],
            "List classes"
        );
    }

    #[test]
    fn test_document_shape() {
        let files = vec![scan_route_source(Path::new("classes.ts"), CLASS_ROUTES)];
        let options = SwaggerOptions {
            server_url: "https://kg.example.com".to_string(),
            ..Default::default()
        };

        let document = build_openapi(&files, &options);
        let spec = &document.spec;

        assert_eq!(spec["openapi"], "3.0.0");
        assert_eq!(spec["servers"][0]["url"], "https://kg.example.com");
        assert_eq!(
            spec["components"]["securitySchemes"]["bearerAuth"]["scheme"],
            "bearer"
        );

        let list = &spec["paths"]["/api/classes"]["get"];
        assert_eq!(list["description"], "Classes visible to the caller");
        assert_eq!(list["security"][0]["bearerAuth"], serde_json::json!([]));

        let detail = &spec["paths"]["/api/classes/{id}"]["get"];
        assert!(detail.get("security").is_none());
        assert!(detail.get("description").is_none());

        // Defined tags first, then tags only seen on operations.
        assert_eq!(document.tags, 2);
        assert_eq!(spec["tags"][0]["name"], "Classes");
        assert_eq!(spec["tags"][0]["description"], "Class management");
        assert_eq!(spec["tags"][1]["name"], "Reports");
    }

    #[test]
    fn test_generate_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("classes.ts"), CLASS_ROUTES).unwrap();
        fs::create_dir(dir.path().join("v1")).unwrap();
        fs::write(dir.path().join("v1").join("legacy.js"), LEGACY_ROUTES).unwrap();

        let document = generate_swagger(dir.path(), &SwaggerOptions::default()).unwrap();

        assert_eq!(document.endpoints, 2);
        assert_eq!(document.duplicates, 1);

        let missing = generate_swagger(&dir.path().join("nope"), &SwaggerOptions::default());
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}

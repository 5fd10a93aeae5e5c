use openapi_from_comments::{
    cli::{self, CliArgs},
    collector::{collect, CollectError},
    config::Config,
    openapi_builder::build_document,
    serializer::{serialize_json, serialize_yaml},
};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper function to create a temporary test project
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn shop_project() -> TempDir {
    create_test_project(vec![
        ("Cargo.toml", "[package]\nname = \"shop\"\n"),
        ("src/lib.rs", "pub mod api;\npub mod models;\n"),
        ("src/api.rs", include_str!("fixtures/shop/api.rs")),
        ("src/models.rs", include_str!("fixtures/shop/models.rs")),
    ])
}

fn shop_config() -> Config {
    Config::from_yaml("title: Shop\nversion: 2.0.0\ndefault-responses:\n  422: models.ApiError\n").unwrap()
}

fn shop_document(dir: &TempDir) -> Value {
    let config = shop_config();
    let program = collect(&[dir.path().to_path_buf()], &config).expect("collect failed");
    let document = build_document(&program, &config);
    serde_json::from_str(&serialize_json(&document).unwrap()).unwrap()
}

#[test]
fn test_program_from_shop_project() {
    let dir = shop_project();
    let program = collect(&[dir.path().to_path_buf()], &shop_config()).unwrap();

    let routes: Vec<(String, String)> = program
        .endpoints
        .iter()
        .map(|e| (e.method.to_string(), e.path.clone()))
        .collect();
    assert_eq!(
        routes,
        vec![
            ("POST".to_string(), "/login".to_string()),
            ("GET".to_string(), "/users".to_string()),
            ("GET".to_string(), "/users/:id".to_string()),
            ("POST".to_string(), "/users".to_string()),
        ]
    );

    let keys: Vec<&str> = program.references.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "models.ApiError",
            "models.CreateUser",
            "models.Page[models.User]",
            "models.User",
            "models.UserFilter",
        ]
    );
    assert!(program.references.values().all(|r| r.is_complete()));
}

#[test]
fn test_paths_and_parameters() {
    let dir = shop_project();
    let doc = shop_document(&dir);

    assert_eq!(doc["openapi"], "3.0.3");
    assert_eq!(doc["info"]["title"], "Shop");
    assert_eq!(doc["info"]["version"], "2.0.0");

    let get_user = &doc["paths"]["/users/{id}"]["get"];
    assert_eq!(get_user["summary"], "Fetch one user.");
    assert_eq!(get_user["tags"], json!(["users"]));
    assert_eq!(
        get_user["parameters"],
        json!([{
            "name": "id",
            "in": "path",
            "description": "The user ID",
            "required": true,
            "schema": { "type": "integer" }
        }])
    );
    assert_eq!(get_user["responses"]["404"]["description"], "No such user.");
    assert_eq!(
        get_user["responses"]["404"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/models.ApiError"
    );

    let list = &doc["paths"]["/users"]["get"];
    let params = list["parameters"].as_array().unwrap();
    let names: Vec<&str> = params.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["page", "q"]);
    assert_eq!(params[0]["in"], "query");
    assert_eq!(params[0]["required"], false);
    assert_eq!(params[0]["description"], "Page number");
    assert_eq!(params[0]["schema"]["default"], 1);
    assert_eq!(params[0]["schema"]["minimum"], 1);
    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/models.Page_models.User_"
    );

    let create = &doc["paths"]["/users"]["post"];
    assert_eq!(
        create["requestBody"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/models.CreateUser"
    );
    assert_eq!(create["responses"]["422"]["description"], "Unprocessable Entity");
    assert_eq!(
        create["responses"]["422"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/models.ApiError"
    );

    let login = &doc["paths"]["/login"]["post"];
    let form = &login["requestBody"]["content"]["application/x-www-form-urlencoded"]["schema"];
    assert_eq!(form["required"], json!(["user", "password"]));
    assert_eq!(form["properties"]["user"]["type"], "string");
    assert_eq!(login["responses"]["204"]["description"], "No Content");
    assert!(login["responses"]["204"].get("content").is_none());
}

#[test]
fn test_component_schemas() {
    let dir = shop_project();
    let doc = shop_document(&dir);
    let schemas = doc["components"]["schemas"].as_object().unwrap();

    let mut names: Vec<&str> = schemas.keys().map(String::as_str).collect();
    names.sort();
    // The query bag is expanded into parameters, not emitted
    assert_eq!(
        names,
        vec!["models.ApiError", "models.CreateUser", "models.Page_models.User_", "models.User"]
    );

    let user = &schemas["models.User"];
    assert_eq!(user["description"], "A registered user.");
    assert_eq!(user["required"], json!(["userId"]));
    let props = user["properties"].as_object().unwrap();
    let mut prop_names: Vec<&str> = props.keys().map(String::as_str).collect();
    prop_names.sort();
    assert_eq!(prop_names, vec!["createdAt", "displayName", "manager", "status", "userId"]);
    assert_eq!(props["userId"]["format"], "int64");
    assert_eq!(props["createdAt"], json!({ "type": "string", "format": "date-time" }));
    assert_eq!(props["status"]["enum"], json!(["active", "on_hold"]));
    assert_eq!(props["manager"]["$ref"], "#/components/schemas/models.User");

    let page = &schemas["models.Page_models.User_"];
    assert_eq!(
        page["properties"]["items"],
        json!({ "type": "array", "items": { "$ref": "#/components/schemas/models.User" } })
    );

    let create = &schemas["models.CreateUser"];
    assert_eq!(create["required"], json!(["display_name"]));
    assert_eq!(create["properties"]["email"]["format"], "idn-email");
}

#[test]
fn test_yaml_output() {
    let dir = shop_project();
    let config = shop_config();
    let program = collect(&[dir.path().to_path_buf()], &config).unwrap();
    let yaml = serialize_yaml(&build_document(&program, &config)).unwrap();

    assert!(yaml.starts_with("openapi:"));
    assert!(yaml.contains("/users/{id}"));
    let back: Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back["info"]["title"], "Shop");
}

#[test]
fn test_errors_are_reported_with_locations() {
    let dir = create_test_project(vec![(
        "src/lib.rs",
        "/// GET /broken\n///\n/// Query:\n///   q: Search {bogus}\n///\n/// Response: $empty\npub fn broken() {}\n\n/// GET /fine\n///\n/// Response: $empty\npub fn fine() {}\n",
    )]);

    let err = collect(&[dir.path().to_path_buf()], &Config::default()).unwrap_err();
    let CollectError::Blocks(list) = &err else {
        panic!("expected block errors, got {:?}", err);
    };
    assert_eq!(list.len(), 1);

    let text = err.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("src/lib.rs:3: "), "{}", lines[0]);
    assert!(lines[0].contains("bogus"));
    assert_eq!(lines[1], "1 error");
}

#[test]
fn test_empty_project_handling() {
    let dir = create_test_project(vec![("src/lib.rs", "//! Nothing documented here.\n")]);
    let config = Config::default();
    let program = collect(&[dir.path().to_path_buf()], &config).unwrap();
    assert!(program.endpoints.is_empty());

    let document = build_document(&program, &config);
    assert!(document.paths.is_empty());
    assert!(document.components.is_none());
}

#[test]
fn test_cli_writes_json_file() {
    let dir = shop_project();
    let config_path = dir.path().join("openapi.yaml");
    std::fs::write(&config_path, "default-responses:\n  422: models.ApiError\n").unwrap();
    let output = dir.path().join("docs/openapi.json");

    let args = CliArgs::try_parse_from([
        PathBuf::from("openapi-from-comments"),
        dir.path().to_path_buf(),
        PathBuf::from("-c"),
        config_path,
        PathBuf::from("-f"),
        PathBuf::from("json"),
        PathBuf::from("-o"),
        output.clone(),
    ])
    .unwrap();
    let args = cli::parse_args_from_parsed(args).unwrap();
    cli::run(args).unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["info"]["title"], "API");
    assert!(written["paths"]["/login"]["post"].is_object());
}

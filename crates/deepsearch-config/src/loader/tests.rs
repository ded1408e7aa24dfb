//! Tests for layered configuration loading.

use super::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Build a project tree with a `.git` marker and a nested cwd.
fn project_tree(root: &Path) -> (PathBuf, PathBuf) {
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");
    (project_root, cwd)
}

#[test]
fn parse_minimal_config() {
    let config = DeepSearchConfig::load_from_str("{}").expect("config");
    assert_eq!(config.agent.max_steps, 10);
    assert_eq!(config.tools.output_policy.truncation_marker, "...[truncated]");
}

#[test]
fn parse_json5_with_comments_and_tokens() {
    let json5 = r#"{
        // local dev
        agent: { max_steps: 4 },
        cache: { provider: "sqlite", ttl_secs: 3600 },
        auth: { tokens: { "dev-token": "alice" } },
    }"#;
    let config = DeepSearchConfig::load_from_str(json5).expect("config");
    assert_eq!(config.agent.max_steps, 4);
    assert_eq!(config.cache.provider, "sqlite");
    assert_eq!(config.cache.ttl_secs, Some(3600));
    assert_eq!(config.auth.user_for_token("dev-token"), Some("alice"));
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = DeepSearchConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_unknown_cache_provider() {
    let err = DeepSearchConfig::load_from_str(r#"{ cache: { provider: "redis" } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cache.provider"));
    assert!(msg.contains("memory, sqlite"));
}

#[test]
fn rejects_wrong_value_type() {
    let err =
        DeepSearchConfig::load_from_str(r#"{ search: { num_results: "ten" } }"#).unwrap_err();
    let ConfigError::InvalidField { path, message } = err else {
        panic!("expected invalid field error");
    };
    assert_eq!(path, "config:search.num_results");
    assert_eq!(message, "expected non-negative integer");
}

#[test]
fn rejects_zero_step_budget() {
    let err = DeepSearchConfig::load_from_str(r#"{ agent: { max_steps: 0 } }"#).unwrap_err();
    assert!(format!("{err}").contains("agent.max_steps"));
}

#[test]
fn cwd_layer_overrides_project_and_user() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let (project_root, cwd) = project_tree(root);

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        "{ agent: { max_steps: 2, title_max_chars: 10 }, server: { port: 9000 } }",
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ agent: { max_steps: 3 } }",
    );
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ agent: { max_steps: 5 } }");

    let mut options = LayeredConfigOptions::new(&cwd);
    options.user_config_path = Some(user_config);

    let layered = DeepSearchConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.agent.max_steps, 5);
    assert_eq!(layered.config.agent.title_max_chars, 10);
    assert_eq!(layered.config.server.port, 9000);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd
        ]
    );
}

#[test]
fn runtime_override_wins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let (_, cwd) = project_tree(root);
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ server: { port: 8100 } }");
    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, "{ server: { port: 8200 } }");

    let mut options = LayeredConfigOptions::new(&cwd).with_runtime_path(&runtime_config);
    options.user_config_path = None;

    let layered = DeepSearchConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.server.port, 8200);
}

#[test]
fn project_layer_at_cwd_is_loaded_once() {
    let temp = TempDir::new().expect("tmp");
    let (project_root, _) = project_tree(temp.path());
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ agent: { max_steps: 7 } }",
    );

    let mut options = LayeredConfigOptions::new(&project_root);
    options.user_config_path = None;

    let layered = DeepSearchConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.agent.max_steps, 7);
    assert_eq!(layered.layers.len(), 1);
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let mut options =
        LayeredConfigOptions::new(temp.path()).with_runtime_path(temp.path().join("missing.json5"));
    options.user_config_path = None;

    let err = DeepSearchConfig::load_layered_with_options(options).unwrap_err();
    let ConfigError::Read { path, .. } = err else {
        panic!("expected read error");
    };
    assert!(path.ends_with("missing.json5"));
}

#[test]
fn scraper_body_cap_is_configurable_but_not_zero() {
    let config = DeepSearchConfig::load_from_str("{ scraper: { max_bytes: 4096 } }").expect("config");
    assert_eq!(config.scraper.max_bytes, 4096);
    assert_eq!(DeepSearchConfig::default().scraper.max_bytes, 2 * 1024 * 1024);

    let err = DeepSearchConfig::load_from_str("{ scraper: { max_bytes: 0 } }").unwrap_err();
    let ConfigError::InvalidField { path, .. } = err else {
        panic!("expected invalid field error");
    };
    assert_eq!(path, "scraper.max_bytes");
}

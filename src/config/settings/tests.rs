use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.documents.folder, PathBuf::from("pdf_folder"));
    assert_eq!(config.gemini.embedding_model, "models/embedding-001");
    assert_eq!(config.gemini.chat_model, "gemini-pro");
    assert!((config.gemini.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(config.chunking.chunk_size, 10_000);
    assert_eq!(config.chunking.chunk_overlap, 1_000);
    assert_eq!(config.retrieval.top_k, 4);
    assert_eq!(
        config.paths.responses_file,
        PathBuf::from("responses").join("responses.csv")
    );
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.gemini.base_url = "ftp://example.com".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.gemini.chat_model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.gemini.temperature = 3.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.gemini.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_overlap = invalid_config.chunking.chunk_size;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::OverlapTooLarge(10_000, 10_000))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.documents.folder = PathBuf::new();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::EmptyPath("documents.folder"))
    ));
}

#[test]
fn api_url_generation() {
    let mut config = GeminiConfig::default();
    let url = config.api_url().expect("default url should parse");
    assert_eq!(url.as_str(), "https://generativelanguage.googleapis.com/");

    config.base_url = "http://127.0.0.1:8080".to_string();
    let url = config.api_url().expect("local url should parse");
    assert_eq!(url.port(), Some(8080));

    config.base_url = "not a url".to_string();
    assert!(config.api_url().is_err());
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let partial_toml = r#"
        [documents]
        folder = "/srv/papers"

        [retrieval]
        top_k = 8
    "#;

    let config: Config = toml::from_str(partial_toml).expect("partial config should parse");
    assert_eq!(config.documents.folder, PathBuf::from("/srv/papers"));
    assert_eq!(config.retrieval.top_k, 8);
    assert_eq!(config.gemini, GeminiConfig::default());
    assert_eq!(config.chunking, ChunkingConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = GeminiConfig::default();

    assert!(config.set_base_url("http://localhost:9000".to_string()).is_ok());
    assert!(config.set_embedding_model("models/text-embedding-004".to_string()).is_ok());
    assert!(config.set_chat_model("gemini-1.5-flash".to_string()).is_ok());
    assert!(config.set_temperature(0.0).is_ok());
    assert!(config.set_batch_size(100).is_ok());

    assert!(config.set_base_url("localhost".to_string()).is_err());
    assert!(config.set_embedding_model("   ".to_string()).is_err());
    assert!(config.set_chat_model(String::new()).is_err());
    assert!(config.set_temperature(-0.1).is_err());
    assert!(config.set_batch_size(101).is_err());

    assert_eq!(config.base_url, "http://localhost:9000");
    assert_eq!(config.chat_model, "gemini-1.5-flash");
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing config should load defaults");
    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.gemini, GeminiConfig::default());
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.documents.folder = PathBuf::from("manuals");
    config.retrieval.top_k = 6;
    config.save().expect("should save config");

    assert!(config.config_file_path().exists());

    let reloaded = Config::load(temp_dir.path()).expect("should reload saved config");
    assert_eq!(reloaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[chunking]\nchunk_size = 500\nchunk_overlap = 600\n",
    )
    .expect("should write config");

    let result = Config::load(temp_dir.path());
    assert!(result.is_err());
}

#[test]
#[serial]
fn api_key_from_environment() {
    let config = Config {
        gemini: GeminiConfig {
            api_key_env: "PDF_CHAT_TEST_API_KEY".to_string(),
            ..GeminiConfig::default()
        },
        ..Config::default()
    };

    // SAFETY: serialised with every other test touching the environment
    unsafe { env::remove_var("PDF_CHAT_TEST_API_KEY") };
    assert!(matches!(
        config.api_key(),
        Err(ConfigError::MissingApiKey(name)) if name == "PDF_CHAT_TEST_API_KEY"
    ));

    // SAFETY: see above
    unsafe { env::set_var("PDF_CHAT_TEST_API_KEY", "  secret-key \n") };
    assert_eq!(config.api_key().expect("key should be read"), "secret-key");

    // SAFETY: see above
    unsafe { env::remove_var("PDF_CHAT_TEST_API_KEY") };
}

#[test]
fn error_display_messages() {
    let errors = vec![
        ConfigError::InvalidProtocol("ftp".to_string()),
        ConfigError::InvalidTemperature(9.0),
        ConfigError::InvalidBatchSize(0),
        ConfigError::InvalidModel(String::new()),
        ConfigError::MissingApiKey("GOOGLE_API_KEY".to_string()),
        ConfigError::OverlapTooLarge(10, 5),
    ];

    for error in errors {
        let message = format!("{error}");
        assert!(message.len() > 10);
    }
}

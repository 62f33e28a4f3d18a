use std::time::Duration;

use assert_matches::assert_matches;

use chemfetch::config::{Config, ConfigLoader, DEFAULT_BASE_URL, Overrides, RetryEntry};
use chemfetch::domain::Threshold;
use chemfetch::error::ChemFetchError;

#[test]
fn load_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("chemfetch.json");
    std::fs::write(
        &path,
        r#"{
            "base_url": "https://mirror.example.org/rest/pug/",
            "similarity_threshold": 85,
            "similarity_max_results": 25,
            "poll_interval_ms": 250,
            "poll_deadline_secs": 30,
            "max_polls": 40,
            "retry": { "max_retries": 4 },
            "properties": ["MolecularFormula", " XLogP ", ""]
        }"#,
    )
    .unwrap();

    let settings = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();

    assert_eq!(settings.base_url.as_str(), "https://mirror.example.org/rest/pug");
    assert_eq!(settings.threshold.get(), 85);
    assert_eq!(settings.similarity_max_results, 25);
    assert_eq!(settings.search_max_results, 100);
    assert_eq!(settings.poll.interval, Duration::from_millis(250));
    assert_eq!(settings.poll.deadline, Duration::from_secs(30));
    assert_eq!(settings.poll.max_polls, Some(40));
    assert_eq!(settings.retry.max_retries, 4);
    assert_eq!(settings.retry.base_delay, Duration::from_millis(200));
    assert_eq!(settings.properties, vec!["MolecularFormula", "XLogP"]);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");

    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();

    assert_matches!(err, ChemFetchError::ConfigRead(_));
}

#[test]
fn unknown_keys_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("chemfetch.json");
    std::fs::write(&path, r#"{ "treshold": 80 }"#).unwrap();

    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();

    assert_matches!(err, ChemFetchError::ConfigParse(_));
}

#[test]
fn threshold_above_hundred_is_rejected() {
    let config = Config {
        similarity_threshold: Some(120),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(ChemFetchError::InvalidThreshold(120))
    );
}

#[test]
fn zero_limits_are_rejected() {
    let cases = [
        Config {
            similarity_max_results: Some(0),
            ..Config::default()
        },
        Config {
            max_in_flight: Some(0),
            ..Config::default()
        },
        Config {
            poll_interval_ms: Some(0),
            ..Config::default()
        },
        Config {
            request_timeout_secs: Some(0),
            ..Config::default()
        },
        Config {
            max_polls: Some(0),
            ..Config::default()
        },
        Config {
            properties: Some(vec![" ".to_string()]),
            ..Config::default()
        },
        Config {
            base_url: Some("not a url".to_string()),
            ..Config::default()
        },
    ];
    for config in cases {
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(ChemFetchError::InvalidConfig(_))
        );
    }
}

#[test]
fn retry_entry_without_values_keeps_defaults() {
    let settings = ConfigLoader::resolve_config(Config {
        retry: Some(RetryEntry::default()),
        ..Config::default()
    })
    .unwrap();
    assert_eq!(settings.retry.max_retries, 2);
    assert_eq!(settings.base_url.as_str(), DEFAULT_BASE_URL);
}

#[test]
fn overrides_replace_threshold_and_caps() {
    let mut settings = ConfigLoader::resolve_config(Config::default()).unwrap();
    settings
        .apply(&Overrides {
            threshold: Some(Threshold::new(95).unwrap()),
            max_results: Some(3),
        })
        .unwrap();
    assert_eq!(settings.threshold.get(), 95);
    assert_eq!(settings.similarity_max_results, 3);
    assert_eq!(settings.search_max_results, 3);

    settings.apply(&Overrides::default()).unwrap();
    assert_eq!(settings.threshold.get(), 95);
}

#[test]
fn zero_max_results_override_is_rejected() {
    let mut settings = ConfigLoader::resolve_config(Config::default()).unwrap();

    let err = settings
        .apply(&Overrides {
            threshold: None,
            max_results: Some(0),
        })
        .unwrap_err();

    assert_matches!(err, ChemFetchError::InvalidConfig(_));
    assert_eq!(settings.similarity_max_results, 10);
    assert_eq!(settings.search_max_results, 100);
}

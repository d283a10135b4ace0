use httpbackup_config::{Config, ConfigStore, Site, load_or_create};
use serde_json::{Value, json};
use tempfile::TempDir;

#[tokio::test]
async fn hand_edited_document_is_normalised_on_load() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        serde_json::to_string(&json!({
            "IntervalMinutes": -2,
            "Retention": -5,
            "BackupFolder": "  ",
            "Sites": [
                { "Enabled": true, "Name": " shop ", "Url": " http://shop/backup.zip " },
                { "Enabled": true, "Name": "SHOP", "Url": "http://other" },
                { "Name": "", "Url": "" }
            ]
        }))?,
    )?;

    let config = load_or_create(&path).await?;
    assert_eq!(config.interval_minutes, 1);
    assert_eq!(config.retention, 30);
    assert!(!config.backup_folder.as_os_str().is_empty());
    assert_eq!(config.web_listen_addr, "127.0.0.1:8123");
    assert_eq!(
        config.sites,
        vec![Site {
            enabled: true,
            name: "shop".into(),
            url: "http://shop/backup.zip".into(),
        }]
    );
    Ok(())
}

#[tokio::test]
async fn saved_document_uses_pascal_case_keys() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = ConfigStore::new(dir.path().join("config.json"))?;
    let config = Config {
        interval_minutes: 0,
        backup_folder: dir.path().join("backups"),
        ..Config::initial()
    };
    store.save(&config).await?;

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(store.path())?)?;
    assert_eq!(raw["IntervalMinutes"], json!(0));
    assert_eq!(raw["Retention"], json!(30));
    assert_eq!(raw["Sites"][0]["Url"], json!("http://example.com/backup.zip"));

    let reloaded = store.load().await?;
    assert_eq!(reloaded.effective_interval_minutes(), 0);
    Ok(())
}

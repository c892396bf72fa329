// ABOUTME: Database-backed tests for setting storage, resolution, forms and seeding
// ABOUTME: Each test runs against a fresh in-memory SQLite database

#[cfg(test)]
mod tests {
    use crate::action::{Flash, SettingsService, Submission};
    use crate::error::SettingsError;
    use crate::form::{FormState, SettingForm};
    use crate::resolver::{cache_key, Resolved, SettingsResolver};
    use crate::rules::Rule;
    use crate::seed::{SeedRow, SettingsMigration};
    use crate::storage::SettingStorage;
    use crate::types::{Setting, SettingType};
    use crate::upload::{LocalUploadStore, UploadedFile};
    use crate::validation::ValidatorRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use setkeep_storage::{connect_in_memory, BaseCache, MokaCache};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn setup_storage() -> SettingStorage {
        let pool = connect_in_memory().await.unwrap();
        SettingStorage::new(pool)
    }

    fn resolver_for(storage: &SettingStorage) -> SettingsResolver {
        let cache = MokaCache::<Option<String>>::unbounded("settings");
        SettingsResolver::new(storage.clone(), Arc::new(cache))
    }

    async fn seed_general(storage: &SettingStorage) {
        let rows = [
            Setting::new("general", "title", "Site title")
                .with_value("My site")
                .with_position(1)
                .with_rules(vec![Rule::new("string").with("max", 20)]),
            Setting::new("general", "limit", "Page limit")
                .with_value("25")
                .with_position(2)
                .with_rules(vec![Rule::new("integer").with("max", 500)]),
            Setting::new("general", "empty", "Empty").with_position(3),
        ];
        for mut setting in rows {
            storage.insert(&mut setting).await.unwrap();
        }
    }

    fn positions(settings: &[Setting]) -> Vec<(String, i64)> {
        settings
            .iter()
            .map(|s| (s.key.clone(), s.position.unwrap_or_default()))
            .collect()
    }

    // ---- storage ----

    #[tokio::test]
    async fn test_insert_appends_after_highest_position() {
        let storage = setup_storage().await;
        for (key, position) in [("a", 1), ("b", 3), ("c", 5)] {
            let mut setting = Setting::new("general", key, key).with_position(position);
            storage.insert(&mut setting).await.unwrap();
        }

        let mut appended = Setting::new("general", "d", "d");
        storage.insert(&mut appended).await.unwrap();
        assert_eq!(appended.position, Some(6));

        // Position 0 means "not set"
        let mut zero = Setting::new("general", "e", "e").with_position(0);
        storage.insert(&mut zero).await.unwrap();
        assert_eq!(zero.position, Some(7));
    }

    #[tokio::test]
    async fn test_insert_into_empty_section_starts_at_one() {
        let storage = setup_storage().await;
        let mut setting = Setting::new("mail", "host", "SMTP host");
        storage.insert(&mut setting).await.unwrap();
        assert_eq!(setting.position, Some(1));
        assert_eq!(storage.max_position("mail").await.unwrap(), Some(1));
        assert_eq!(storage.max_position("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_key_is_rejected() {
        let storage = setup_storage().await;
        let mut first = Setting::new("general", "title", "Title");
        storage.insert(&mut first).await.unwrap();

        let mut second = Setting::new("general", "title", "Other");
        assert!(storage.insert(&mut second).await.is_err());
    }

    #[tokio::test]
    async fn test_find_by_section_orders_by_position() {
        let storage = setup_storage().await;
        for (key, position) in [("c", 3), ("a", 1), ("b", 2)] {
            let mut setting = Setting::new("general", key, key).with_position(position);
            storage.insert(&mut setting).await.unwrap();
        }
        let mut other = Setting::new("mail", "host", "Host");
        storage.insert(&mut other).await.unwrap();

        let settings = storage.find_by_section("general").await.unwrap();
        assert_eq!(
            positions(&settings),
            vec![("a".into(), 1), ("b".into(), 2), ("c".into(), 3)]
        );
        assert_eq!(
            storage.list_sections().await.unwrap(),
            vec!["general".to_string(), "mail".to_string()]
        );
    }

    #[tokio::test]
    async fn test_structured_columns_round_trip() {
        let storage = setup_storage().await;
        let variants = vec![json!(["a", "Alpha"]), json!({"b": "Beta"}), json!([])];
        let rules = vec![
            Rule::new("required"),
            Rule::new("in").with("range", json!(["a", "b"])),
        ];
        let mut setting = Setting::new("general", "choice", "Choice")
            .with_type(SettingType::Selectbox)
            .with_variants(variants.clone())
            .with_rules(rules.clone());
        storage.insert(&mut setting).await.unwrap();

        let loaded = storage.find("general", "choice").await.unwrap().unwrap();
        assert_eq!(loaded.type_key, SettingType::Selectbox);
        assert_eq!(loaded.variants().unwrap(), variants);
        assert_eq!(loaded.rules().unwrap(), rules);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let storage = setup_storage().await;
        seed_general(&storage).await;

        assert!(storage
            .update_value("general", "title", Some("New title"))
            .await
            .unwrap());
        assert!(!storage.update_value("general", "missing", Some("x")).await.unwrap());

        let mut edited = storage.find("general", "limit").await.unwrap().unwrap();
        edited.name = "Items per page".to_string();
        edited.hint = Some("Between 1 and 500".to_string());
        assert!(storage.update(&mut edited).await.unwrap());

        let reloaded = storage.find("general", "limit").await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Items per page");
        assert_eq!(reloaded.value.as_deref(), Some("25"));

        assert!(storage.delete("general", "title").await.unwrap());
        assert!(!storage.delete("general", "title").await.unwrap());
        assert!(storage.find("general", "title").await.unwrap().is_none());
    }

    // ---- resolver ----

    #[tokio::test]
    async fn test_set_then_get_refreshes_cache() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let resolver = resolver_for(&storage);

        // Prime the cache with the old value
        assert_eq!(
            resolver.get_value("general.title", None).await.unwrap(),
            Some("My site".to_string())
        );

        assert!(resolver.set("general.title", Some("Renamed")).await.unwrap());

        let cached = resolver.cache().get(&cache_key("general", "title")).await.unwrap();
        assert_eq!(cached, Some(Some("Renamed".to_string())));
        assert_eq!(
            resolver.get_value("general.title", None).await.unwrap(),
            Some("Renamed".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_applies_default_only_to_empty_values() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let resolver = resolver_for(&storage);

        // Stored NULL
        assert_eq!(
            resolver.get_value("general.empty", Some("fallback")).await.unwrap(),
            Some("fallback".to_string())
        );

        // Stored empty string
        resolver.set("general.empty", Some("")).await.unwrap();
        assert_eq!(
            resolver.get_value("general.empty", Some("fallback")).await.unwrap(),
            Some("fallback".to_string())
        );

        // "0" is a value
        resolver.set("general.empty", Some("0")).await.unwrap();
        assert_eq!(
            resolver.get_value("general.empty", Some("fallback")).await.unwrap(),
            Some("0".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_missing_key_is_not_found() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let resolver = resolver_for(&storage);

        let result = resolver.get("general.missing", Some("fallback")).await;
        assert!(matches!(result, Err(SettingsError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_section_returns_all_values() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let resolver = resolver_for(&storage);

        match resolver.get("general", Some("ignored")).await.unwrap() {
            Resolved::Section(values) => {
                assert_eq!(values.len(), 3);
                assert_eq!(values["title"].as_deref(), Some("My site"));
                assert_eq!(values["empty"], None);
            }
            other => panic!("Expected section, got {:?}", other),
        }

        match resolver.get("unknown", None).await.unwrap() {
            Resolved::Section(values) => assert!(values.is_empty()),
            other => panic!("Expected section, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_unknown_key_leaves_cache_untouched() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let resolver = resolver_for(&storage);

        let result = resolver.set("general.missing", Some("x")).await;
        assert!(matches!(result, Err(SettingsError::NotFound { .. })));
        assert!(!resolver
            .cache()
            .exists(&cache_key("general", "missing"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_set_requires_section_and_key() {
        let storage = setup_storage().await;
        let resolver = resolver_for(&storage);

        let result = resolver.set("general", Some("x")).await;
        assert!(matches!(result, Err(SettingsError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let resolver = resolver_for(&storage);

        resolver.get_value("general.limit", None).await.unwrap();
        // Write behind the resolver's back
        storage.update_value("general", "limit", Some("50")).await.unwrap();
        assert_eq!(
            resolver.get_value("general.limit", None).await.unwrap(),
            Some("25".to_string())
        );

        assert!(resolver.invalidate("general", "limit").await.unwrap());
        assert_eq!(
            resolver.get_value("general.limit", None).await.unwrap(),
            Some("50".to_string())
        );
    }

    // ---- form ----

    #[tokio::test]
    async fn test_form_loads_section_in_order() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let registry = ValidatorRegistry::with_builtins();

        let form = SettingForm::load_by_section(&storage, &registry, "general")
            .await
            .unwrap();
        assert_eq!(form.keys(), vec!["title", "limit", "empty"]);
        assert_eq!(form.state(), FormState::Loaded);
        assert_eq!(form.get("limit"), Some("25"));
        assert_eq!(form.get("missing"), None);
        assert_eq!(form.labels()[1], ("limit", "Page limit"));

        // No stored rules means "accept anything"
        let rules = form.rules_for("empty").unwrap();
        assert_eq!(rules, vec![&Rule::new("safe")]);
    }

    #[tokio::test]
    async fn test_form_for_unknown_section_fails() {
        let storage = setup_storage().await;
        let registry = ValidatorRegistry::with_builtins();

        let result = SettingForm::load_by_section(&storage, &registry, "nothing").await;
        assert!(matches!(result, Err(SettingsError::SectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_form_with_unknown_validator_fails() {
        let storage = setup_storage().await;
        let mut setting = Setting::new("general", "odd", "Odd").with_rules(vec![Rule::new("nope")]);
        storage.insert(&mut setting).await.unwrap();
        let registry = ValidatorRegistry::with_builtins();

        let result = SettingForm::load_by_section(&storage, &registry, "general").await;
        assert!(matches!(result, Err(SettingsError::UnknownValidator(name)) if name == "nope"));
    }

    #[tokio::test]
    async fn test_invalid_field_blocks_every_write() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let registry = ValidatorRegistry::with_builtins();
        let resolver = resolver_for(&storage);

        let mut form = SettingForm::load_by_section(&storage, &registry, "general")
            .await
            .unwrap();
        let submission = HashMap::from([
            ("title".to_string(), "Valid title".to_string()),
            ("limit".to_string(), "lots".to_string()),
        ]);
        assert_eq!(form.load(&submission), 2);

        let result = form.save(&resolver, None).await;
        match result {
            Err(SettingsError::ValidationFailed(errors)) => {
                assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["limit"]);
                assert_eq!(errors["limit"], vec!["Page limit must be an integer."]);
            }
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
        assert_eq!(form.state(), FormState::Failed);

        let title = storage.find("general", "title").await.unwrap().unwrap();
        assert_eq!(title.value.as_deref(), Some("My site"));
    }

    #[tokio::test]
    async fn test_valid_form_saves_every_field() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let registry = ValidatorRegistry::with_builtins();
        let resolver = resolver_for(&storage);

        let mut form = SettingForm::load_by_section(&storage, &registry, "general")
            .await
            .unwrap();
        assert!(form.set("limit", Some("100".to_string())));
        assert!(!form.set("missing", Some("ignored".to_string())));
        form.save(&resolver, None).await.unwrap();
        assert_eq!(form.state(), FormState::Saved);

        assert_eq!(
            resolver.get_value("general.limit", None).await.unwrap(),
            Some("100".to_string())
        );
        assert!(storage.find("general", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_form_view_lists_options_and_errors() {
        let storage = setup_storage().await;
        let mut setting = Setting::new("look", "theme", "Theme")
            .with_type(SettingType::Radiolist)
            .with_variants(vec![json!(["light", "Light"]), json!(["dark", "Dark"])])
            .with_rules(vec![Rule::new("in").with("range", json!(["light", "dark"]))]);
        storage.insert(&mut setting).await.unwrap();
        let registry = ValidatorRegistry::with_builtins();

        let mut form = SettingForm::load_by_section(&storage, &registry, "look")
            .await
            .unwrap();
        form.set("theme", Some("neon".to_string()));
        assert!(!form.validate());

        let view = form.view();
        let field = &view.fields[0];
        assert_eq!(field.widget, SettingType::Radiolist);
        assert_eq!(field.options.len(), 2);
        assert_eq!(field.options[1].label, "Dark");
        assert_eq!(field.errors, vec!["Theme is invalid."]);
    }

    #[tokio::test]
    async fn test_form_view_omits_options_for_plain_fields() {
        let storage = setup_storage().await;
        // seed rows default their variants to ["safe"]
        let migration = SettingsMigration::new(
            "general",
            vec![SeedRow::new("general", "title").value("x")],
        )
        .unwrap();
        migration.up(storage.pool()).await.unwrap();
        let registry = ValidatorRegistry::with_builtins();

        let form = SettingForm::load_by_section(&storage, &registry, "general")
            .await
            .unwrap();
        let view = form.view();
        assert_eq!(view.fields[0].widget, SettingType::Text);
        assert!(view.fields[0].options.is_empty());
    }

    #[tokio::test]
    async fn test_file_field_stores_upload_url() {
        let storage = setup_storage().await;
        let mut logo = Setting::new("general", "logo", "Logo").with_type(SettingType::File);
        storage.insert(&mut logo).await.unwrap();
        let mut title = Setting::new("general", "title", "Title");
        storage.insert(&mut title).await.unwrap();

        let registry = ValidatorRegistry::with_builtins();
        let resolver = resolver_for(&storage);
        let dir = tempfile::tempdir().unwrap();
        let uploads = LocalUploadStore::new(dir.path(), "/uploads");

        let mut form = SettingForm::load_by_section(&storage, &registry, "general")
            .await
            .unwrap();
        let file = UploadedFile::new("logo.png", b"png".to_vec());
        assert!(form.attach_file("logo", file.clone()).unwrap());
        assert!(!form.attach_file("missing", file.clone()).unwrap());
        assert!(matches!(
            form.attach_file("title", file),
            Err(SettingsError::InvalidInput(_))
        ));

        form.save(&resolver, Some(&uploads)).await.unwrap();

        let url = resolver.get_value("general.logo", None).await.unwrap().unwrap();
        assert!(url.starts_with("/uploads/general_logo_"));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_upload_without_store_fails() {
        let storage = setup_storage().await;
        let mut logo = Setting::new("general", "logo", "Logo").with_type(SettingType::File);
        storage.insert(&mut logo).await.unwrap();
        let registry = ValidatorRegistry::with_builtins();
        let resolver = resolver_for(&storage);

        let mut form = SettingForm::load_by_section(&storage, &registry, "general")
            .await
            .unwrap();
        form.attach_file("logo", UploadedFile::new("a.png", vec![1]))
            .unwrap();

        assert!(form.save(&resolver, None).await.is_err());
        assert_eq!(storage.find("general", "logo").await.unwrap().unwrap().value, None);
    }

    // ---- section action ----

    #[tokio::test]
    async fn test_section_action_flashes_result() {
        let storage = setup_storage().await;
        seed_general(&storage).await;
        let service = SettingsService::new(
            resolver_for(&storage),
            Arc::new(ValidatorRegistry::with_builtins()),
        );

        let page = service.handle_section("general", None).await.unwrap();
        assert_eq!(page.flash, None);
        assert_eq!(page.form.fields.len(), 3);

        let page = service
            .handle_section("general", Some(Submission::new().with_value("limit", "300")))
            .await
            .unwrap();
        assert_eq!(page.flash, Some(Flash::Success("Saved".to_string())));

        let page = service
            .handle_section("general", Some(Submission::new().with_value("limit", "900")))
            .await
            .unwrap();
        assert_eq!(page.flash, Some(Flash::Error("Save error!".to_string())));
        assert_eq!(page.form.fields[1].errors, vec!["Page limit must be no greater than 500."]);
        assert_eq!(
            service.resolver().get_value("general.limit", None).await.unwrap(),
            Some("300".to_string())
        );

        let missing = service.handle_section("nothing", None).await;
        assert!(matches!(missing, Err(SettingsError::SectionNotFound(_))));
    }

    // ---- seeding ----

    #[tokio::test]
    async fn test_seed_shifts_occupied_positions() {
        let storage = setup_storage().await;
        let migration = SettingsMigration::new(
            "general",
            vec![
                SeedRow::new("general", "a").position(1),
                SeedRow::new("general", "b").position(2),
                SeedRow::new("general", "c").position(3),
                SeedRow::new("general", "inserted").position(2),
                SeedRow::new("general", "tail"),
            ],
        )
        .unwrap();

        let report = migration.up(storage.pool()).await.unwrap();
        assert_eq!(report.inserted.len(), 5);
        assert!(report.skipped.is_empty());

        let settings = storage.find_by_section("general").await.unwrap();
        assert_eq!(
            positions(&settings),
            vec![
                ("a".into(), 1),
                ("inserted".into(), 2),
                ("b".into(), 3),
                ("c".into(), 4),
                ("tail".into(), 5),
            ]
        );
    }

    #[tokio::test]
    async fn test_seed_skips_invalid_rows() {
        let storage = setup_storage().await;
        let migration = SettingsMigration::new(
            "general",
            vec![
                SeedRow::new("general", ""),
                SeedRow::new("general", "bad_rules").rules(json!("integer")),
                SeedRow::new("general", "ok").name("Fine").value(10),
            ],
        )
        .unwrap();

        let report = migration.up(storage.pool()).await.unwrap();
        assert_eq!(report.inserted, vec!["general.ok".to_string()]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[1].path, "general.bad_rules");

        let ok = storage.find("general", "ok").await.unwrap().unwrap();
        assert_eq!(ok.name, "Fine");
        assert_eq!(ok.value.as_deref(), Some("10"));
        assert_eq!(ok.rules().unwrap(), vec![Rule::new("safe")]);
    }

    #[tokio::test]
    async fn test_seed_rerun_keeps_existing_rows() {
        let storage = setup_storage().await;
        let migration = SettingsMigration::new(
            "general",
            vec![
                SeedRow::new("general", "a").position(1),
                SeedRow::new("general", "b").position(2),
            ],
        )
        .unwrap();

        migration.up(storage.pool()).await.unwrap();
        let report = migration.up(storage.pool()).await.unwrap();
        assert!(report.inserted.is_empty());
        assert_eq!(report.skipped.len(), 2);

        // Rolled-back shifts leave positions untouched
        let settings = storage.find_by_section("general").await.unwrap();
        assert_eq!(positions(&settings), vec![("a".into(), 1), ("b".into(), 2)]);
    }

    #[tokio::test]
    async fn test_seed_down_removes_rows() {
        let storage = setup_storage().await;
        let migration = SettingsMigration::new(
            "mail",
            vec![SeedRow::new("mail", "host"), SeedRow::new("mail", "port").value(25)],
        )
        .unwrap();

        migration.up(storage.pool()).await.unwrap();
        assert_eq!(migration.down(storage.pool()).await.unwrap(), 2);
        assert!(storage.find_by_section("mail").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_down_aborts_on_missing_row() {
        let storage = setup_storage().await;
        let migration = SettingsMigration::new(
            "mail",
            vec![SeedRow::new("mail", "host"), SeedRow::new("mail", "port")],
        )
        .unwrap();
        migration.up(storage.pool()).await.unwrap();
        storage.delete("mail", "port").await.unwrap();

        let result = migration.down(storage.pool()).await;
        assert!(matches!(
            result,
            Err(SettingsError::RollbackFailed { ref key, .. }) if key == "port"
        ));
        // The earlier delete was rolled back with the rest
        assert!(storage.find("mail", "host").await.unwrap().is_some());
    }
}

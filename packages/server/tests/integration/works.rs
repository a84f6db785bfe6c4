use std::sync::Arc;

use serde_json::json;

use crate::common::{FailingBlobStore, TestApp, routes};

/// Minimal `input` metadata part for an upload.
fn input_for(owner_id: i32) -> serde_json::Value {
    json!({ "owner_id": owner_id })
}

/// Insert a work row directly into the DB, bypassing the upload endpoint.
async fn insert_work_row(
    app: &TestApp,
    owner_id: i32,
    storage_key: &str,
    kind: common::CreationKind,
) -> i32 {
    use sea_orm::{ActiveModelTrait, Set};
    use server::entity::creation;

    let row = creation::ActiveModel {
        name: Set(storage_key.to_string()),
        storage_key: Set(storage_key.to_string()),
        synopsis: Set(None),
        priority: Set(None),
        weight: Set(None),
        kind: Set(kind),
        owner_id: Set(owner_id),
        size: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    row.insert(&app.db).await.expect("insert work row").id
}

/// Count committed object files, ignoring the store's `.tmp` spool dir.
fn stored_object_count(app: &TestApp) -> usize {
    std::fs::read_dir(&app.blob_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.file_name() != ".tmp")
                .count()
        })
        .unwrap_or(0)
}

mod work_upload {
    use super::*;

    #[tokio::test]
    async fn creates_record_and_stores_blob() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("alice").await;

        let data = b"\x89PNG\r\n\x1a\nfake image bytes".to_vec();
        let input = json!({
            "owner_id": owner_id,
            "weight": 2.5,
            "priority": 10,
            "synopsis": "vacation shot",
        });
        let res = app.upload_work("photo.png", data.clone(), &input).await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        assert_eq!(res.body["name"].as_str().unwrap(), "photo.png");
        assert_eq!(res.body["kind"].as_str().unwrap(), "DONE");
        assert_eq!(res.body["owner_id"].as_i64().unwrap(), owner_id as i64);
        assert_eq!(res.body["size"].as_i64().unwrap(), data.len() as i64);
        assert_eq!(res.body["synopsis"].as_str().unwrap(), "vacation shot");
        assert_eq!(res.body["priority"].as_i64().unwrap(), 10);
        assert_eq!(res.body["weight"].as_f64().unwrap(), 2.5);
        assert!(res.body["created_at"].as_str().is_some());

        // The storage key is generated, never the client filename.
        let storage_key = res.body["storage_key"].as_str().unwrap();
        assert_ne!(storage_key, "photo.png");
        assert!(storage_key.ends_with(".png"));

        // The object landed in the blob store under that key.
        let stored = std::fs::read(app.blob_dir.join(storage_key)).expect("stored object");
        assert_eq!(stored, data);
    }

    #[tokio::test]
    async fn generates_fresh_key_per_upload() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("bob").await;

        let res1 = app
            .upload_work("same.txt", b"v1".to_vec(), &input_for(owner_id))
            .await;
        let res2 = app
            .upload_work("same.txt", b"v2".to_vec(), &input_for(owner_id))
            .await;

        assert_eq!(res1.status, 201);
        assert_eq!(res2.status, 201);
        assert_ne!(
            res1.body["storage_key"].as_str().unwrap(),
            res2.body["storage_key"].as_str().unwrap()
        );
        assert_eq!(stored_object_count(&app), 2);
    }

    #[tokio::test]
    async fn file_without_filename_falls_back_to_key_as_name() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("carol").await;

        // File part with no filename attribute.
        let part = reqwest::multipart::Part::bytes(b"anonymous bytes".to_vec());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("input", input_for(owner_id).to_string());
        let res = app.upload_raw(form).await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        let storage_key = res.body["storage_key"].as_str().unwrap();
        assert_eq!(res.body["name"].as_str().unwrap(), storage_key);
        // No original filename, so no extension to carry over.
        assert!(!storage_key.contains('.'));
    }

    #[tokio::test]
    async fn malformed_input_rejected_before_blob_write() {
        let app = TestApp::spawn().await;
        app.create_user("dave").await;

        let part = reqwest::multipart::Part::bytes(b"payload".to_vec())
            .file_name("file.bin".to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("input", "{not valid json");
        let res = app.upload_raw(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
        assert_eq!(stored_object_count(&app), 0);
    }

    #[tokio::test]
    async fn missing_input_field_returns_400() {
        let app = TestApp::spawn().await;

        let part =
            reqwest::multipart::Part::bytes(b"payload".to_vec()).file_name("a.txt".to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let res = app.upload_raw(form).await;

        assert_eq!(res.status, 400);
        assert!(res.text.contains("input"), "unexpected body: {}", res.text);
    }

    #[tokio::test]
    async fn missing_file_field_returns_400() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("erin").await;

        let form =
            reqwest::multipart::Form::new().text("input", input_for(owner_id).to_string());
        let res = app.upload_raw(form).await;

        assert_eq!(res.status, 400);
        assert!(res.text.contains("file"), "unexpected body: {}", res.text);
    }

    #[tokio::test]
    async fn unknown_owner_returns_400() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_work("orphan.txt", b"data".to_vec(), &input_for(9999))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
        assert_eq!(stored_object_count(&app), 0);
    }

    #[tokio::test]
    async fn non_positive_owner_id_returns_400() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_work("zero.txt", b"data".to_vec(), &input_for(0))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn oversize_upload_rejected() {
        let app = TestApp::spawn_with_max_object_size(1024).await;
        let owner_id = app.create_user("frank").await;

        let res = app
            .upload_work("big.bin", vec![0u8; 4096], &input_for(owner_id))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
        assert_eq!(stored_object_count(&app), 0);
    }

    #[tokio::test]
    async fn blob_write_failure_returns_502_without_record() {
        let app = TestApp::spawn_with_store(Arc::new(FailingBlobStore)).await;
        let owner_id = app.create_user("grace").await;

        let res = app
            .upload_work("doomed.txt", b"data".to_vec(), &input_for(owner_id))
            .await;

        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"].as_str().unwrap(), "STORAGE_WRITE_FAILED");

        // Nothing was recorded for the owner.
        let list = app.get(&routes::works_by_owner(owner_id)).await;
        assert_eq!(list.body["total"].as_u64().unwrap(), 0);
    }
}

mod work_read {
    use super::*;

    #[tokio::test]
    async fn get_returns_uploaded_work() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("henry").await;

        let upload = app
            .upload_work("notes.pdf", b"pdf bytes".to_vec(), &input_for(owner_id))
            .await;
        let id = upload.id();

        let res = app.get(&routes::work(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"].as_i64().unwrap(), id as i64);
        assert_eq!(res.body["name"].as_str().unwrap(), "notes.pdf");
        assert_eq!(
            res.body["storage_key"].as_str().unwrap(),
            upload.body["storage_key"].as_str().unwrap()
        );
    }

    #[tokio::test]
    async fn get_unknown_id_returns_404() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::work(99999)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"].as_str().unwrap(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn draft_is_hidden_from_get() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("iris").await;
        let draft_id =
            insert_work_row(&app, owner_id, "draft-key.txt", common::CreationKind::Draft).await;

        let res = app.get(&routes::work(draft_id)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn list_returns_only_owners_done_works() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;

        app.upload_work("a1.txt", b"a1".to_vec(), &input_for(alice))
            .await;
        app.upload_work("a2.txt", b"a2".to_vec(), &input_for(alice))
            .await;
        app.upload_work("b1.txt", b"b1".to_vec(), &input_for(bob))
            .await;
        insert_work_row(&app, alice, "a-draft.txt", common::CreationKind::Draft).await;

        let res = app.get(&routes::works_by_owner(alice)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"].as_u64().unwrap(), 2);
        let names: Vec<&str> = res.body["works"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"a1.txt"));
        assert!(names.contains(&"a2.txt"));

        let res = app.get(&routes::works_by_owner(bob)).await;
        assert_eq!(res.body["total"].as_u64().unwrap(), 1);
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("judy").await;

        app.upload_work("old.txt", b"old".to_vec(), &input_for(owner_id))
            .await;
        let newer = app
            .upload_work("new.txt", b"new".to_vec(), &input_for(owner_id))
            .await;

        let res = app.get(&routes::works_by_owner(owner_id)).await;
        assert_eq!(
            res.body["works"][0]["id"].as_i64().unwrap(),
            newer.id() as i64
        );
    }
}

mod work_preview {
    use super::*;

    #[tokio::test]
    async fn streams_stored_bytes_inline() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("kate").await;

        let data = b"\x89PNG\r\n\x1a\npreview bytes".to_vec();
        let upload = app
            .upload_work("photo.png", data.clone(), &input_for(owner_id))
            .await;
        let storage_key = upload.body["storage_key"].as_str().unwrap().to_string();

        let res = app.get_raw(&routes::work_preview(upload.id())).await;
        assert_eq!(res.status().as_u16(), 200);

        let headers = res.headers();
        assert_eq!(
            headers.get("content-type").unwrap().to_str().unwrap(),
            "image/png"
        );
        assert_eq!(
            headers.get("content-length").unwrap().to_str().unwrap(),
            data.len().to_string()
        );
        let cd = headers
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cd.starts_with("inline; filename=\""), "disposition: {cd}");
        assert!(cd.contains(&storage_key), "disposition: {cd}");

        let bytes = res.bytes().await.unwrap();
        assert_eq!(bytes.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_octet_stream() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("liam").await;

        let upload = app
            .upload_work("data.xyz", b"opaque".to_vec(), &input_for(owner_id))
            .await;

        let res = app.get_raw(&routes::work_preview(upload.id())).await;
        assert_eq!(
            res.headers().get("content-type").unwrap().to_str().unwrap(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn unknown_id_returns_404_without_blob_access() {
        // The failing store turns any blob access into a 502, so a 404
        // here proves the lookup short-circuits before the store.
        let app = TestApp::spawn_with_store(Arc::new(FailingBlobStore)).await;

        let res = app.get(&routes::work_preview(424242)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"].as_str().unwrap(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn draft_work_is_previewable() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("mona").await;

        // Drafts are hidden from the read endpoints but their objects still
        // stream.
        std::fs::write(app.blob_dir.join("draft-item.txt"), b"draft body").unwrap();
        let draft_id =
            insert_work_row(&app, owner_id, "draft-item.txt", common::CreationKind::Draft).await;

        let res = app.get_raw(&routes::work_preview(draft_id)).await;
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.bytes().await.unwrap().as_ref(), b"draft body");
    }

    #[tokio::test]
    async fn missing_object_maps_to_upstream_error() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("nina").await;
        let id =
            insert_work_row(&app, owner_id, "gone-key.bin", common::CreationKind::Done).await;

        let res = app.get(&routes::work_preview(id)).await;
        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"].as_str().unwrap(), "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn backend_failure_maps_to_upstream_error() {
        let app = TestApp::spawn_with_store(Arc::new(FailingBlobStore)).await;
        let owner_id = app.create_user("omar").await;
        let id =
            insert_work_row(&app, owner_id, "any-key.bin", common::CreationKind::Done).await;

        let res = app.get(&routes::work_preview(id)).await;
        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"].as_str().unwrap(), "UPSTREAM_ERROR");
    }
}

mod work_download {
    use super::*;

    #[tokio::test]
    async fn copies_object_to_local_path() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("pete").await;

        let data = b"relay me to disk".to_vec();
        let upload = app
            .upload_work("relay.bin", data.clone(), &input_for(owner_id))
            .await;

        let dest = app.blob_dir.parent().unwrap().join("exports/relay-copy.bin");
        let res = app.download_work_to(upload.id(), &dest).await;

        assert_eq!(res.status, 200, "download failed: {}", res.text);
        assert_eq!(
            res.body["path"].as_str().unwrap(),
            dest.to_string_lossy().as_ref()
        );
        assert_eq!(res.body["bytes"].as_u64().unwrap(), data.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[tokio::test]
    async fn overwrites_existing_destination() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("quinn").await;

        let upload = app
            .upload_work("fresh.txt", b"fresh".to_vec(), &input_for(owner_id))
            .await;

        let dest = app.blob_dir.parent().unwrap().join("copy.txt");
        std::fs::write(&dest, b"stale local content with extra length").unwrap();

        let res = app.download_work_to(upload.id(), &dest).await;
        assert_eq!(res.status, 200);
        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn unknown_id_returns_404() {
        let app = TestApp::spawn().await;

        let dest = app.blob_dir.parent().unwrap().join("never.bin");
        let res = app.download_work_to(31337, &dest).await;
        assert_eq!(res.status, 404);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn empty_path_returns_400() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("rita").await;
        let upload = app
            .upload_work("x.txt", b"x".to_vec(), &input_for(owner_id))
            .await;

        let res = app
            .get(&format!("{}?path=", routes::work_download(upload.id())))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");

        // Missing the parameter entirely is also a 400.
        let res = app.get(&routes::work_download(upload.id())).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn missing_object_surfaces_upstream_error() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("sara").await;
        let id =
            insert_work_row(&app, owner_id, "vanished.bin", common::CreationKind::Done).await;

        let dest = app.blob_dir.parent().unwrap().join("vanished-copy.bin");
        let res = app.download_work_to(id, &dest).await;

        // The relay reports the failure instead of answering 200 with no
        // file written.
        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"].as_str().unwrap(), "UPSTREAM_ERROR");
        assert!(!dest.exists());
    }
}

mod full_flow {
    use super::*;

    #[tokio::test]
    async fn upload_preview_download_round_trip() {
        let app = TestApp::spawn().await;
        let owner_id = app.create_user("tara").await;

        let data = b"\x89PNG\r\n\x1a\nround trip image".to_vec();
        let input = json!({
            "owner_id": owner_id,
            "weight": 1.0,
            "priority": 5,
            "synopsis": "end to end",
        });
        let upload = app.upload_work("photo.png", data.clone(), &input).await;
        assert_eq!(upload.status, 201);
        let id = upload.id();

        let preview = app.get_raw(&routes::work_preview(id)).await;
        assert_eq!(preview.status().as_u16(), 200);
        assert_eq!(
            preview
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap(),
            "image/png"
        );
        assert_eq!(preview.bytes().await.unwrap().as_ref(), data.as_slice());

        let dest = app.blob_dir.parent().unwrap().join("round-trip.png");
        let download = app.download_work_to(id, &dest).await;
        assert_eq!(download.status, 200);
        assert_eq!(std::fs::read(&dest).unwrap(), data);

        let listed = app.get(&routes::works_by_owner(owner_id)).await;
        assert_eq!(listed.body["total"].as_u64().unwrap(), 1);
        assert_eq!(
            listed.body["works"][0]["name"].as_str().unwrap(),
            "photo.png"
        );
    }
}

use permit_core::{
    update, DocumentKind, DocumentReference, Downloaded, Manifest, ManifestEntry, Msg,
    ObjectLocators, RunPlan, RunState,
};
use pretty_assertions::assert_eq;

fn entry(title: &str, bytes: u64) -> ManifestEntry {
    ManifestEntry {
        filename: format!("{}.pdf", title.to_lowercase()),
        title: title.to_string(),
        original_url: format!("https://example.gov/{title}.pdf"),
        original_filename: format!("{title}.pdf"),
        s3_url: format!("s3://bucket/p/{title}.pdf"),
        https_url: format!("https://bucket.s3.us-east-2.amazonaws.com/p/{title}.pdf"),
        local_path: format!("data/{title}.pdf"),
        file_size_bytes: bytes,
        file_size_mb: permit_core::size_in_mb(bytes),
        downloaded_at: "2024-05-01T12:00:00+00:00".to_string(),
        jurisdiction: "example-oh".to_string(),
        document_type: "permit-form".to_string(),
    }
}

#[test]
fn manifest_serializes_as_array_with_stable_fields() {
    let mut manifest = Manifest::new();
    manifest.push(entry("Alpha", 1_572_864));
    manifest.push(entry("Bravo", 10));

    let json = manifest.to_json_pretty().unwrap();
    assert!(json.starts_with("[\n  {"));
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let items = parsed.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Alpha");
    assert_eq!(items[1]["title"], "Bravo");

    let mut keys: Vec<_> = items[0].as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "document_type",
            "downloaded_at",
            "file_size_bytes",
            "file_size_mb",
            "filename",
            "https_url",
            "jurisdiction",
            "local_path",
            "original_filename",
            "original_url",
            "s3_url",
            "title",
        ]
    );
    assert_eq!(items[0]["file_size_bytes"], 1_572_864);
    assert_eq!(items[0]["file_size_mb"], 1.5);

    let back: Vec<ManifestEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.as_slice(), manifest.entries());
}

#[test]
fn empty_manifest_is_empty_array() {
    assert_eq!(Manifest::new().to_json_pretty().unwrap(), "[]");
}

#[test]
fn summary_previews_first_titles() {
    let plan = RunPlan {
        listing_url: "https://example.gov/".to_string(),
        prefix: "p/".to_string(),
        jurisdiction: "example-oh".to_string(),
        kind: DocumentKind::default(),
    };
    let references: Vec<_> = (0..12)
        .map(|i| DocumentReference {
            url: format!("https://example.gov/{i}.pdf"),
            title: format!("Form {i}"),
            original_filename: format!("{i}.pdf"),
        })
        .collect();
    let (mut state, _) = update(RunState::new(plan), Msg::Start);
    state = update(state, Msg::ListingFetched(Ok(references))).0;
    for index in 0..12 {
        state = update(
            state,
            Msg::DownloadFinished {
                index,
                result: Ok(Downloaded {
                    local_path: format!("data/form-{index}.pdf"),
                    bytes: 1024 * 1024,
                }),
            },
        )
        .0;
        let key = format!("p/form-{index}.pdf");
        state = update(
            state,
            Msg::UploadFinished {
                index,
                result: Ok(ObjectLocators::for_key("bucket", "us-east-2", &key)),
                completed_at: "2024-05-01T12:00:00+00:00".to_string(),
            },
        )
        .0;
    }

    let summary = state.summary();
    assert_eq!(summary.uploaded, 12);
    assert_eq!(summary.total_mb, 12.0);
    let (shown, remaining) = summary.title_preview(10);
    assert_eq!(shown.len(), 10);
    assert_eq!(shown[0], "Form 0");
    assert_eq!(remaining, 2);
}

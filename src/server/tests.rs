use super::*;
use crate::pdf::testing::{fixture_pdf, page_widths, pdfium_or_skip};
use crate::pdf::{Orientation, PageFormat, PrintAccess, RasterFormat, Rect};
use base64::Engine;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn pdf_source(name: &str, widths: &[i64]) -> PdfSource {
    PdfSource::Base64 {
        base64: base64::engine::general_purpose::STANDARD.encode(fixture_pdf(widths)),
        file_name: Some(name.to_string()),
        mime_type: Some("application/pdf".to_string()),
    }
}

fn text_source() -> PdfSource {
    PdfSource::Base64 {
        base64: base64::engine::general_purpose::STANDARD.encode(b"just some notes"),
        file_name: Some("notes.txt".to_string()),
        mime_type: Some("text/plain".to_string()),
    }
}

fn cached(server: &PdfServer, link: &DownloadLink) -> Vec<u8> {
    server.cache.get(link.cache_key.as_deref().unwrap()).unwrap()
}

fn merge_params(sources: Vec<PdfSource>) -> MergePdfsParams {
    MergePdfsParams {
        sources,
        file_name: None,
        output_path: None,
    }
}

fn split_params(source: PdfSource, pages: &str, mode: SplitMode) -> SplitPdfParams {
    SplitPdfParams {
        source,
        pages: pages.to_string(),
        mode,
        password: None,
        output_path: None,
    }
}

fn protect_params(source: PdfSource, user_password: &str) -> ProtectPdfParams {
    ProtectPdfParams {
        source,
        user_password: user_password.to_string(),
        owner_password: None,
        allow_print: PrintAccess::Full,
        allow_copy: true,
        allow_modify: true,
        password: None,
        file_name: None,
        output_path: None,
    }
}

#[test]
fn test_source_name() {
    assert_eq!(
        PdfServer::source_name(&PdfSource::Path {
            path: "/test.pdf".to_string()
        }),
        "/test.pdf"
    );
    assert_eq!(
        PdfServer::source_name(&PdfSource::Base64 {
            base64: "...".to_string(),
            file_name: None,
            mime_type: None,
        }),
        "<base64>"
    );
    assert_eq!(PdfServer::source_name(&pdf_source("dropped.pdf", &[1])), "dropped.pdf");
    assert_eq!(
        PdfServer::source_name(&PdfSource::CacheRef {
            cache_key: "abc123".to_string()
        }),
        "<cache:abc123>"
    );
}

#[test]
fn test_pdf_source_deserialization() {
    let source: PdfSource = serde_json::from_str(r#"{"path": "/test.pdf"}"#).unwrap();
    assert!(matches!(source, PdfSource::Path { .. }));

    let source: PdfSource = serde_json::from_str(
        r#"{"base64": "JVBERi0xLjQ=", "file_name": "a.pdf", "mime_type": "application/pdf"}"#,
    )
    .unwrap();
    match source {
        PdfSource::Base64 {
            file_name,
            mime_type,
            ..
        } => {
            assert_eq!(file_name.as_deref(), Some("a.pdf"));
            assert_eq!(mime_type.as_deref(), Some("application/pdf"));
        }
        other => panic!("unexpected source {:?}", other),
    }

    let source: PdfSource =
        serde_json::from_str(r#"{"url": "https://example.com/test.pdf"}"#).unwrap();
    assert!(matches!(source, PdfSource::Url { .. }));

    let source: PdfSource = serde_json::from_str(r#"{"cache_key": "abc123"}"#).unwrap();
    assert!(matches!(source, PdfSource::CacheRef { .. }));
}

#[test]
fn test_pdf_source_rejects_unknown_shapes() {
    let err = serde_json::from_str::<PdfSource>(r#""/test.pdf""#).unwrap_err();
    assert!(err.to_string().contains("a string"));

    let err = serde_json::from_str::<PdfSource>(r#"{"file": "/test.pdf"}"#).unwrap_err();
    assert!(err.to_string().contains("file"));

    assert!(serde_json::from_str::<PdfSource>(r#"{"path": 42}"#).is_err());
}

#[test]
fn test_params_defaults() {
    let params: OpenPdfParams = serde_json::from_str(r#"{"source": {"path": "/a.pdf"}}"#).unwrap();
    assert!(params.include_image);
    assert_eq!(params.format, RasterFormat::Png);

    let params: ViewPageParams = serde_json::from_str(r#"{"session_id": "x"}"#).unwrap();
    assert_eq!(params.action, ViewAction::Current);

    let params: SplitPdfParams =
        serde_json::from_str(r#"{"source": {"path": "/a.pdf"}, "pages": "1-2"}"#).unwrap();
    assert_eq!(params.mode, SplitMode::Extract);

    let params: ProtectPdfParams =
        serde_json::from_str(r#"{"source": {"path": "/a.pdf"}, "user_password": "pw"}"#)
            .unwrap();
    assert_eq!(params.allow_print, PrintAccess::Full);
    assert!(params.allow_copy && params.allow_modify);
}

#[tokio::test]
async fn test_merge_keeps_source_order() {
    let server = PdfServer::new();
    let params = merge_params(vec![
        pdf_source("first.pdf", &[612]),
        pdf_source("second.pdf", &[595, 300]),
    ]);

    let result = server.process_merge_pdfs(&params).await.unwrap();
    assert_eq!(result.source_count, 2);
    assert_eq!(result.page_count, 3);

    let output = result.output.unwrap();
    assert_eq!(output.file_name, "merged.pdf");
    assert_eq!(page_widths(&cached(&server, &output)), vec![612.0, 595.0, 300.0]);
}

#[tokio::test]
async fn test_merge_requires_two_files() {
    let server = PdfServer::new();
    let params = merge_params(vec![pdf_source("only.pdf", &[612])]);

    let err = server.process_merge_pdfs(&params).await.unwrap_err();
    assert!(matches!(
        err,
        Error::TooFewSources {
            required: 2,
            given: 1
        }
    ));
}

#[tokio::test]
async fn test_merge_names_failing_file() {
    let server = PdfServer::new();
    let params = merge_params(vec![
        pdf_source("first.pdf", &[612]),
        text_source(),
        pdf_source("third.pdf", &[612]),
    ]);

    let err = server.process_merge_pdfs(&params).await.unwrap_err();
    match &err {
        Error::SourceFailed { index, source } => {
            assert_eq!(*index, 2);
            assert!(matches!(**source, Error::UnsupportedFileType { .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.client_message().starts_with("File 2:"));
    assert!(server.cache.is_empty());
}

#[tokio::test]
async fn test_merge_tool_reports_error_in_json() {
    let server = PdfServer::new();
    let params = merge_params(vec![pdf_source("first.pdf", &[612]), text_source()]);

    let json = server.merge_pdfs(Parameters(params)).await;
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let result = &value["results"][0];
    assert_eq!(result["source_count"], 2);
    assert!(result["error"].as_str().unwrap().contains("Please select a PDF file"));
    assert!(result.get("output").is_none());
}

#[tokio::test]
async fn test_merge_writes_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out").join("combined.pdf");
    let server = PdfServer::new();
    let params = MergePdfsParams {
        sources: vec![pdf_source("a.pdf", &[612]), pdf_source("b.pdf", &[612])],
        file_name: Some("combined".to_string()),
        output_path: Some(target.to_string_lossy().to_string()),
    };

    let result = server.process_merge_pdfs(&params).await.unwrap();
    let output = result.output.unwrap();
    assert_eq!(output.file_name, "combined.pdf");
    assert_eq!(output.path, Some(target.to_string_lossy().to_string()));
    assert_eq!(std::fs::read(&target).unwrap(), cached(&server, &output));
}

#[tokio::test]
async fn test_output_over_cache_budget_has_no_cache_key() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("big.pdf");
    let server = PdfServer::with_config(ServerConfig {
        cache_max_bytes: 100,
        ..ServerConfig::default()
    });
    let params = MergePdfsParams {
        sources: vec![pdf_source("a.pdf", &[612]), pdf_source("b.pdf", &[612])],
        file_name: None,
        output_path: Some(target.to_string_lossy().to_string()),
    };

    let result = server.process_merge_pdfs(&params).await.unwrap();
    let output = result.output.unwrap();
    assert_eq!(output.cache_key, None);
    assert!(output.size > 100);
    assert!(server.cache.is_empty());
    assert_eq!(std::fs::read(&target).unwrap().len() as u64, output.size);

    let json = server.merge_pdfs(Parameters(params)).await;
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["results"][0]["output"].get("cache_key").is_none());
}

#[tokio::test]
async fn test_split_extract_selected_pages() {
    let server = PdfServer::new();
    let params = split_params(
        pdf_source("report.pdf", &[100, 200, 300, 400]),
        "3, 2",
        SplitMode::Extract,
    );

    let result = server.process_split_pdf(&params).await.unwrap();
    assert_eq!(result.pages, vec![2, 3]);
    assert_eq!(result.outputs.len(), 1);
    assert_eq!(result.outputs[0].file_name, "report-split.pdf");
    assert_eq!(page_widths(&cached(&server, &result.outputs[0])), vec![200.0, 300.0]);
}

#[tokio::test]
async fn test_split_burst_one_file_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let server = PdfServer::new();
    let mut params = split_params(
        pdf_source("report.pdf", &[100, 200, 300, 400]),
        "1, 3-9",
        SplitMode::Burst,
    );
    params.output_path = Some(dir.path().to_string_lossy().to_string());

    let result = server.process_split_pdf(&params).await.unwrap();
    assert_eq!(result.pages, vec![1, 3, 4]);

    let names: Vec<&str> = result.outputs.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["report-page-1.pdf", "report-page-3.pdf", "report-page-4.pdf"]
    );
    assert_eq!(page_widths(&cached(&server, &result.outputs[1])), vec![300.0]);
    assert!(dir.path().join("report-page-4.pdf").exists());
}

#[tokio::test]
async fn test_split_rejects_bad_selections() {
    let server = PdfServer::new();

    let params = split_params(pdf_source("a.pdf", &[612, 612]), "1-x", SplitMode::Extract);
    assert!(matches!(
        server.process_split_pdf(&params).await,
        Err(Error::InvalidPageRange { .. })
    ));

    let params = split_params(pdf_source("a.pdf", &[612, 612]), "7-9", SplitMode::Extract);
    assert!(matches!(
        server.process_split_pdf(&params).await,
        Err(Error::InvalidPageRange { .. })
    ));
}

#[tokio::test]
async fn test_protect_then_check_password() {
    let server = PdfServer::new();
    let protected = server
        .process_protect_pdf(&protect_params(pdf_source("plan.pdf", &[612, 612]), "secret"))
        .await
        .unwrap();
    assert_eq!(protected.page_count, 2);

    let output = protected.output.unwrap();
    assert_eq!(output.file_name, "plan-protected.pdf");
    let source = PdfSource::CacheRef {
        cache_key: output.cache_key.clone().unwrap(),
    };

    let check = |password: Option<&str>| CheckPasswordParams {
        sources: vec![source.clone()],
        password: password.map(str::to_string),
    };

    let status = server
        .process_check_password(&source, &check(None))
        .await
        .unwrap();
    assert!(status.is_encrypted);
    assert!(status.requires_password);
    assert_eq!(status.password_valid, None);

    let status = server
        .process_check_password(&source, &check(Some("secret")))
        .await
        .unwrap();
    assert_eq!(status.password_valid, Some(true));

    let status = server
        .process_check_password(&source, &check(Some("wrong")))
        .await
        .unwrap();
    assert_eq!(status.password_valid, Some(false));
}

#[tokio::test]
async fn test_check_password_unencrypted() {
    let server = PdfServer::new();
    let source = pdf_source("open.pdf", &[612]);
    let params = CheckPasswordParams {
        sources: vec![source.clone()],
        password: Some("anything".to_string()),
    };

    let status = server.process_check_password(&source, &params).await.unwrap();
    assert!(!status.is_encrypted);
    assert!(!status.requires_password);
    assert_eq!(status.password_valid, None);
    assert_eq!(status.file_name.as_deref(), Some("open.pdf"));
}

#[tokio::test]
async fn test_protect_requires_user_password() {
    let server = PdfServer::new();
    let params = protect_params(pdf_source("a.pdf", &[612]), "");
    assert!(matches!(
        server.process_protect_pdf(&params).await,
        Err(Error::EmptyInput { .. })
    ));
}

#[tokio::test]
async fn test_html_to_pdf_uses_document_title() {
    let server = PdfServer::new();
    let params = HtmlToPdfParams {
        html: "<html><head><title>Quarterly Report</title></head>\
               <body><h1>Summary</h1><p>Revenue grew.</p></body></html>"
            .to_string(),
        title: None,
        page_format: PageFormat::Letter,
        orientation: Orientation::Portrait,
        margin: None,
        file_name: None,
        output_path: None,
    };

    let result = server.process_html_to_pdf(&params).await.unwrap();
    assert_eq!(result.page_count, 1);
    assert_eq!(result.title.as_deref(), Some("Quarterly Report"));

    let output = result.output.unwrap();
    assert_eq!(output.file_name, "Quarterly Report.pdf");
    assert_eq!(page_widths(&cached(&server, &output)), vec![612.0]);
}

#[tokio::test]
async fn test_html_to_pdf_landscape_letter() {
    let server = PdfServer::new();
    let params: HtmlToPdfParams = serde_json::from_str(
        r#"{"html": "<p>Wide table</p>", "page_format": "letter", "orientation": "landscape"}"#,
    )
    .unwrap();
    assert_eq!(params.orientation, Orientation::Landscape);

    let result = server.process_html_to_pdf(&params).await.unwrap();
    let output = result.output.unwrap();
    assert_eq!(output.file_name, "document.pdf");
    assert_eq!(
        crate::pdf::testing::page_dimensions(&cached(&server, &output)),
        vec![(792.0, 612.0)]
    );
}

#[tokio::test]
async fn test_html_to_pdf_rejects_empty_markup() {
    let server = PdfServer::new();
    let params = HtmlToPdfParams {
        html: "<script>alert(1)</script>".to_string(),
        title: None,
        page_format: PageFormat::A4,
        orientation: Orientation::Portrait,
        margin: None,
        file_name: None,
        output_path: None,
    };

    let json = server.html_to_pdf(Parameters(params)).await;
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["results"][0]["error"], "html must not be empty");
}

#[tokio::test]
async fn test_open_rejects_non_pdf_before_decoding() {
    let server = PdfServer::new();
    let params = OpenPdfParams {
        source: text_source(),
        password: None,
        format: RasterFormat::Png,
        include_image: true,
    };

    let err = server.process_open_pdf(&params).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType { .. }));
    assert!(server.sessions.is_empty());
}

/// Run one file-accepting tool against `source`, discarding its output
async fn run_file_tool(
    server: &PdfServer,
    tool: &str,
    source: PdfSource,
) -> crate::error::Result<()> {
    match tool {
        "extract_text" => {
            let params = ExtractTextParams {
                sources: vec![source.clone()],
                pages: None,
                password: None,
                cache: true,
            };
            server.process_extract_text(&source, &params).await.map(drop)
        }
        "extract_metadata" => {
            let params = ExtractMetadataParams {
                sources: vec![source.clone()],
                password: None,
            };
            server.process_extract_metadata(&source, &params).await.map(drop)
        }
        "convert_pdf_to_images" => {
            let params = ConvertPdfToImagesParams {
                sources: vec![source.clone()],
                pages: None,
                scale: None,
                format: RasterFormat::Png,
                password: None,
            };
            server
                .process_convert_pdf_to_images(&source, &params)
                .await
                .map(drop)
        }
        "check_password" => {
            let params = CheckPasswordParams {
                sources: vec![source.clone()],
                password: Some("secret".to_string()),
            };
            server.process_check_password(&source, &params).await.map(drop)
        }
        "protect_pdf" => server
            .process_protect_pdf(&protect_params(source, "secret"))
            .await
            .map(drop),
        "split_pdf" => server
            .process_split_pdf(&split_params(source, "1", SplitMode::Extract))
            .await
            .map(drop),
        other => panic!("unknown tool {}", other),
    }
}

#[rstest]
#[case("extract_text")]
#[case("extract_metadata")]
#[case("convert_pdf_to_images")]
#[case("check_password")]
#[case("protect_pdf")]
#[case("split_pdf")]
#[tokio::test]
async fn test_file_tools_reject_non_pdf(#[case] tool: &str) {
    let server = PdfServer::new();

    let err = run_file_tool(&server, tool, text_source()).await.unwrap_err();
    match err {
        Error::UnsupportedFileType { mime_type, .. } => assert_eq!(mime_type, "text/plain"),
        other => panic!("{} returned {:?}", tool, other),
    }
    assert!(server.cache.is_empty());
}

#[rstest]
#[case("extract_metadata")]
#[case("check_password")]
#[case("split_pdf")]
#[tokio::test]
async fn test_file_tools_reject_pdf_bytes_declared_as_image(#[case] tool: &str) {
    let server = PdfServer::new();
    let source = PdfSource::Base64 {
        base64: base64::engine::general_purpose::STANDARD.encode(fixture_pdf(&[612])),
        file_name: Some("scan.png".to_string()),
        mime_type: Some("image/png".to_string()),
    };

    let err = run_file_tool(&server, tool, source).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType { .. }), "{}", tool);
}

#[tokio::test]
async fn test_unknown_session() {
    let server = PdfServer::new();
    let params = ViewPageParams {
        session_id: "missing".to_string(),
        action: ViewAction::Next,
        page: None,
        scale: None,
        format: RasterFormat::Png,
        include_image: false,
    };
    assert!(matches!(
        server.process_view_page(&params).await,
        Err(Error::SessionNotFound { .. })
    ));

    let json = server
        .close_pdf(Parameters(ClosePdfParams {
            session_id: "missing".to_string(),
        }))
        .await;
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["results"][0]["closed"], false);
}

#[tokio::test]
async fn test_view_and_annotate_session() {
    if !pdfium_or_skip() {
        return;
    }

    let server = PdfServer::new();
    let opened = server
        .process_open_pdf(&OpenPdfParams {
            source: pdf_source("viewer.pdf", &[612, 300]),
            password: None,
            format: RasterFormat::Png,
            include_image: true,
        })
        .await
        .unwrap();
    let session_id = opened.session_id.unwrap();
    let view = opened.view.unwrap();
    assert_eq!((view.page, view.page_count), (1, 2));
    assert!(view.data_base64.is_some());

    let view_params = |action: ViewAction| ViewPageParams {
        session_id: session_id.clone(),
        action,
        page: None,
        scale: None,
        format: RasterFormat::Png,
        include_image: false,
    };

    let next = server.process_view_page(&view_params(ViewAction::Next)).await.unwrap();
    assert!(next.changed);
    assert_eq!(next.view.as_ref().unwrap().width, 300);

    let again = server.process_view_page(&view_params(ViewAction::Next)).await.unwrap();
    assert!(!again.changed);

    let zoomed = server.process_view_page(&view_params(ViewAction::ZoomIn)).await.unwrap();
    assert_eq!(zoomed.view.unwrap().width, 360);

    let annotate = |action: AnnotateAction| AnnotatePdfParams {
        session_id: session_id.clone(),
        action,
        page: None,
        points: None,
        rect: Some(Rect {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 20.0,
        }),
        position: None,
        text: None,
        color: None,
        width: None,
        render: false,
        format: RasterFormat::Png,
    };

    let added = server
        .process_annotate_pdf(&annotate(AnnotateAction::AddHighlight))
        .await
        .unwrap();
    assert_eq!(added.annotation_count, 1);

    let listed = server
        .process_annotate_pdf(&annotate(AnnotateAction::List))
        .await
        .unwrap();
    let annotations = listed.annotations.unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].page(), 2);

    let undone = server
        .process_annotate_pdf(&annotate(AnnotateAction::Undo))
        .await
        .unwrap();
    assert_eq!((undone.removed, undone.annotation_count), (Some(1), 0));

    assert!(server.sessions.close(&session_id));
}

#[test]
fn test_list_pdfs_filters_and_recurses() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alpha.pdf"), b"%PDF-1.4").unwrap();
    std::fs::write(dir.path().join("beta.PDF"), b"%PDF-1.4").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"notes").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("gamma.pdf"), b"%PDF-1.4").unwrap();

    let server = PdfServer::new();
    let list = |recursive: bool, pattern: Option<&str>| {
        server
            .process_list_pdfs(&ListPdfsParams {
                directory: dir.path().to_string_lossy().to_string(),
                recursive,
                pattern: pattern.map(str::to_string),
            })
            .unwrap()
    };

    let flat = list(false, None);
    let names: Vec<&str> = flat.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["alpha.pdf", "beta.PDF"]);
    assert_eq!(flat.files[0].size_label, "8 Bytes");
    assert!(flat.files[0].modified.is_some());

    assert_eq!(list(true, None).total_count, 3);
    assert_eq!(list(true, Some("g*")).total_count, 1);
}

#[test]
fn test_sandbox_blocks_outside_paths() {
    let allowed = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let outside_file = outside.path().join("secret.pdf");
    std::fs::write(&outside_file, b"%PDF-1.4").unwrap();

    let server =
        PdfServer::with_resource_dirs(vec![allowed.path().to_string_lossy().to_string()]);

    assert!(matches!(
        server.validate_path_access(&outside_file.to_string_lossy()),
        Err(Error::PathAccessDenied { .. })
    ));
    assert!(matches!(
        server.process_list_pdfs(&ListPdfsParams {
            directory: outside.path().to_string_lossy().to_string(),
            recursive: false,
            pattern: None,
        }),
        Err(Error::PathAccessDenied { .. })
    ));

    let inside = allowed.path().join("ok.pdf");
    std::fs::write(&inside, b"%PDF-1.4").unwrap();
    assert!(server.validate_path_access(&inside.to_string_lossy()).is_ok());
    assert!(server
        .validate_output_path_access(&allowed.path().join("new.pdf").to_string_lossy())
        .is_ok());
}

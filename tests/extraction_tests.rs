//! Integration tests for decomposition, signal extraction and dataset building.

use std::io::Write;
use std::path::Path;

use phishsift::dataset::{parse_data_from_mbox, DatasetOptions};
use phishsift::export;
use phishsift::extract::decomposer::{extract_leaf_data, flatten_payload, Leaf};
use phishsift::extract::Assembler;
use phishsift::features::{url_characteristics, FeaturePipeline, TextConcat};
use phishsift::model::fields::LabeledFieldSet;
use phishsift::parser::mbox::MboxParser;
use phishsift::parser::parse_raw_message;
use phishsift::signals::{extract_urls_from_html, find_ips};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn sample_rows() -> Vec<LabeledFieldSet> {
    let options = DatasetOptions {
        is_phishy: Some(true),
        ..Default::default()
    };
    parse_data_from_mbox(&fixture("sample.mbox"), options, None).unwrap()
}

// ─── Leaf data and signal matchers ──────────────────────────────────

#[test]
fn test_disposition_parsing() {
    let raw = b"Content-Type: multipart/mixed; boundary=\"B\"\n\n\
--B\nContent-Type: application/pdf\nContent-Disposition: attachment; filename=\"invoice.pdf\"\n\nxx\n\
--B\nContent-Type: text/plain\nContent-Disposition: inline\n\nhi\n\
--B\nContent-Type: text/plain\n\nthere\n\
--B--\n";
    let message = parse_raw_message(raw);
    let parts: Vec<_> = flatten_payload(&message)
        .into_iter()
        .map(extract_leaf_data)
        .map(|leaf| (leaf.disposition, leaf.filename))
        .collect();
    assert_eq!(
        parts,
        vec![
            ("attachment".to_string(), "invoice.pdf".to_string()),
            ("inline".to_string(), "NA".to_string()),
            ("NA".to_string(), "NA".to_string()),
        ]
    );
}

#[test]
fn test_quoted_boundary_parts_are_analyzed() {
    let raw = b"Subject: Verify\nContent-Type: multipart/mixed; boundary=\"==_Part;123\"\n\n\
--==_Part;123\nContent-Type: text/plain\n\nVisit http://evil.example.com/login\n\
--==_Part;123--\n";
    let fields = Assembler::new().assemble(&parse_raw_message(raw));
    assert_eq!(fields.url_links, vec!["http://evil.example.com/login"]);
    assert_eq!(fields.extracted_text, "Visit http://evil.example.com/login");
}

#[test]
fn test_8bit_latin1_text_is_decoded() {
    let raw = b"Content-Type: multipart/mixed; boundary=b\n\n\
--b\nContent-Type: text/plain; charset=iso-8859-1\nContent-Transfer-Encoding: 8bit\n\n\
Caf\xe9 cr\xe8me\n\
--b--\n";
    let fields = Assembler::new().assemble(&parse_raw_message(raw));
    assert_eq!(fields.extracted_text, "Café crème");
    assert_eq!(fields.encoding, "8bit");
}

#[test]
fn test_ip_floor_filter() {
    assert_eq!(find_ips("0.0.0.1 and 192.168.1.1"), vec!["192.168.1.1"]);
}

#[test]
fn test_html_url_precedence() {
    let html = r##"<a href="#top">x</a><a href="http://a.co">y</a>"##;
    assert_eq!(extract_urls_from_html(html), vec!["http://a.co"]);
}

#[test]
fn test_3d_prefix_cleanup() {
    assert_eq!(
        extract_urls_from_html(r#"<img src=3D"http://x.com/a.png">"#),
        vec!["http://x.com/a.png"]
    );
}

#[test]
fn test_flattening_order() {
    let raw = b"Content-Type: multipart/mixed; boundary=\"OUTER\"\n\n\
--OUTER\nContent-Type: text/plain\n\nA\n\
--OUTER\nContent-Type: multipart/alternative; boundary=\"INNER\"\n\n\
--INNER\nContent-Type: text/html\n\nB\n\
--INNER\nContent-Type: text/plain\n\nC\n\
--INNER--\n\
--OUTER--\n";
    let message = parse_raw_message(raw);
    let leaves = flatten_payload(&message);
    assert!(leaves.iter().all(|leaf| matches!(leaf, Leaf::Part { .. })));
    let texts: Vec<String> = leaves.into_iter().map(|l| extract_leaf_data(l).text).collect();
    assert_eq!(texts, vec!["A", "B", "C"]);
}

// ─── Assembly ───────────────────────────────────────────────────────

#[test]
fn test_plain_vs_html_precedence() {
    let raw = b"Content-Type: multipart/alternative; boundary=\"ALT\"\n\n\
--ALT\nContent-Type: text/plain\n\nPlain body with http://plain.example.com/x\n\
--ALT\nContent-Type: text/html\n\n<p>HTML body</p><a href=\"http://html.example.com/y\">go</a>\n\
--ALT--\n";
    let fields = Assembler::new().assemble(&parse_raw_message(raw));
    assert_eq!(fields.url_links, vec!["http://html.example.com/y"]);
    assert_eq!(fields.extracted_text, "Plain body with http://plain.example.com/x");
    assert!(fields.is_html);
}

#[test]
fn test_no_text_leaves() {
    let raw = b"Content-Type: multipart/mixed; boundary=\"B\"\n\n\
--B\nContent-Type: image/png\nContent-Transfer-Encoding: base64\n\niVBORw0KGgo=\n\
--B--\n";
    let fields = Assembler::new().assemble(&parse_raw_message(raw));
    assert_eq!(fields.url_count, 0);
    assert_eq!(fields.ip_count, 0);
    assert_eq!(fields.image_count, 0);
    assert!(!fields.is_html);
    assert_eq!(fields.extracted_text, "");
}

#[test]
fn test_url_characteristics_on_empty_list() {
    assert_eq!(url_characteristics(&[]).as_tuple(), (1.0, 1.0, 0.0, 0.0));
}

#[test]
fn test_assemble_is_idempotent() {
    let raw = b"Content-Type: multipart/alternative; boundary=\"ALT\"\n\n\
--ALT\nContent-Type: text/html\n\n<p>Hi</p><img src=\"http://x.com/a.png\"><script type=\"text/javascript\"></script>\n\
--ALT--\n";
    let message = parse_raw_message(raw);
    let assembler = Assembler::new();
    assert_eq!(assembler.assemble(&message), assembler.assemble(&message));
}

// ─── Fixture archive ────────────────────────────────────────────────

#[test]
fn test_sample_mbox_count() {
    let parser = MboxParser::new(fixture("sample.mbox")).unwrap();
    assert_eq!(parser.count_messages().unwrap(), 4);
}

#[test]
fn test_sample_phishing_message() {
    let rows = sample_rows();
    let first = &rows[0].fields;

    assert_eq!(first.message_id, "phish-1@evil.example");
    assert_eq!(first.from, "\"Security Team\" <security@evil.example>");
    assert_eq!(first.x_priority, "1 (Highest)");
    assert!(first.is_html);
    assert!(first.is_javascript);
    assert!(first.is_css);
    assert_eq!(
        first.url_links,
        vec!["http://192.168.10.20/login", "https://cdn.evil.example/logo.png"]
    );
    assert_eq!(first.ip_addresses, vec!["192.168.10.20"]);
    assert_eq!(first.images_embedded, vec!["https://cdn.evil.example/logo.png"]);
    assert_eq!(first.image_count, 1);
    assert_eq!(first.encoding, "NA");
    assert_eq!(
        first.extracted_text,
        "Your account is locked. Visit http://192.168.10.20/login now."
    );
    assert_eq!(rows[0].is_phishy, Some(true));
}

#[test]
fn test_sample_attachment_messages() {
    let rows = sample_rows();

    let invoice = &rows[1].fields;
    assert_eq!(invoice.x_virus_scanned, "clamav");
    assert_eq!(invoice.attachment_count, 1);
    assert_eq!(invoice.attached_files, vec!["invoice.pdf"]);
    assert!(!invoice.is_html);
    assert_eq!(invoice.encoding, "7bit");
    assert!(invoice
        .url_links
        .contains(&"https://shop.example.com/help".to_string()));
    assert_eq!(invoice.ip_addresses, vec!["10.20.30.40"]);

    let photo = &rows[2].fields;
    assert_eq!(photo.attachment_count, 1);
    assert_eq!(photo.attached_files, vec!["photo.png"]);
    assert_eq!(photo.extracted_text, "");
    assert_eq!(photo.url_count, 0);
    assert_eq!(photo.encoding, "NA");
}

#[test]
fn test_sample_single_part_message() {
    let rows = sample_rows();
    let plain = &rows[3].fields;
    assert_eq!(plain.subject, "Lunch");
    assert_eq!(plain.extracted_text, "Hello from a plain message.");
    assert!(!plain.is_html);
    assert_eq!(plain.url_count, 0);
}

#[test]
fn test_sample_text_and_features() {
    let rows = sample_rows();
    let fields: Vec<_> = rows.into_iter().map(|r| r.fields).collect();

    let texts = TextConcat::default().transform_batch(&fields).unwrap();
    assert_eq!(
        texts[0],
        "Urgent: verify your account\nYour account is locked. Visit http://192.168.10.20/login now."
    );
    assert_eq!(texts[2], "Photo\n");

    let matrix = FeaturePipeline::new(&[], false)
        .unwrap()
        .fit_transform(&fields)
        .unwrap();
    assert_eq!(matrix.n_rows(), 4);
    let urls = matrix.column("URLs").unwrap();
    assert_eq!((urls[0], urls[2], urls[3]), (2.0, 0.0, 0.0));
    assert_eq!(matrix.column("Attachments").unwrap(), vec![0.0, 1.0, 1.0, 0.0]);
    assert_eq!(matrix.column("URL Secured Ratio").unwrap()[0], 0.5);
}

#[test]
fn test_dataset_export_files() {
    let rows = sample_rows();
    let dir = tempfile::tempdir().unwrap();

    let csv_path = dir.path().join("dataset.csv");
    export::csv::export_dataset_csv(&rows, &csv_path).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains("Is Phishy"));
    assert!(csv.contains("phish-1@evil.example"));

    let jsonl_path = dir.path().join("dataset.jsonl");
    export::json::export_jsonl(&rows, &jsonl_path).unwrap();
    let jsonl = std::fs::read_to_string(&jsonl_path).unwrap();
    assert_eq!(jsonl.lines().count(), 4);
}

#[test]
fn test_truncated_archive_still_parses() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(b"From a@b.example Mon Jan 1 00:00:00 2024\nSubject: cut\nContent-Type: multipart/mixed; boundary=\"X\"\n\n--X\nContent-Type: text/plain\n\nunterminated part")
        .unwrap();
    f.flush().unwrap();

    let rows = parse_data_from_mbox(f.path(), DatasetOptions::default(), None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields.subject, "cut");
    assert_eq!(rows[0].fields.extracted_text, "unterminated part");
    assert_eq!(rows[0].is_phishy, None);
}

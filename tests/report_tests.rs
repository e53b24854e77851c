use nmap_report_rs::document::{read_document, write_document};
use nmap_report_rs::emit::{run_file_emitters, EmitterKind, OutputTargets, WriteOutcome};
use nmap_report_rs::extract::extract;
use nmap_report_rs::loader::{load_document, parse_document};
use nmap_report_rs::summary::{print_summary, Summary};
use nmap_report_rs::table::{flatten, write_table};
use nmap_report_rs::{ReportError, ScanReport};
use std::sync::Arc;

const TWO_HOSTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nmaprun scanner="nmap" args="nmap -sV -oX scan.xml 10.10.0.20 10.10.0.21">
  <scaninfo type="syn" protocol="tcp" numservices="1000" services="1-1000"/>
  <host>
    <status state="up" reason="arp-response"/>
    <address addr="10.10.0.20" addrtype="ipv4"/>
    <hostnames><hostname name="metasploitable" type="PTR"/></hostnames>
    <ports>
      <port protocol="tcp" portid="22">
        <state state="open" reason="syn-ack"/>
        <service name="ssh" product="OpenSSH" version="4.7p1" extrainfo="protocol 2.0"/>
      </port>
    </ports>
  </host>
  <host>
    <status state="up"/>
    <address addr="10.10.0.21" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="80">
        <state state="open"/>
        <service name="http"/>
        <script id="http-title">Example</script>
      </port>
    </ports>
  </host>
</nmaprun>
"#;

const MIXED: &str = r#"<nmaprun>
  <host><address addr="192.168.1.5"/><status state="down"/></host>
  <host>
    <address addr="192.168.1.7"/>
    <ports>
      <port protocol="tcp" portid="21"><state state="closed"/></port>
      <port protocol="tcp" portid="443"><state state="open"/>
        <service name="https" version="1.24"/>
        <script id="ssl-cert" output="Subject: commonName=router.lan"/>
        <script id="ssl-enum-ciphers">TLSv1.2: A</script>
        <script id="http-title">Router</script>
      </port>
      <port protocol="udp" portid="161"><state state="open|filtered"/></port>
    </ports>
  </host>
</nmaprun>"#;

fn report_from(xml: &str) -> ScanReport {
    extract(&parse_document(xml).expect("valid document"))
}

fn csv_rows(path: &std::path::Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

#[test]
fn two_host_scenario() {
    let report = report_from(TWO_HOSTS);
    assert_eq!(report.findings.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.csv");
    let outcome = write_table(&report, &path, 100).unwrap();
    assert!(matches!(outcome, WriteOutcome::Written { records: 2, .. }));

    let rows = csv_rows(&path);
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "10.10.0.20");
    assert_eq!(&rows[0][2], "metasploitable");
    assert_eq!(&rows[0][8], "4.7p1");
    assert_eq!(&rows[0][11], "");
    assert_eq!(&rows[0][12], "");
    assert_eq!(&rows[1][1], "10.10.0.21");
    assert_eq!(&rows[1][11], "http-title");
    assert_eq!(&rows[1][12], "Example");

    let summary = Summary::new(&report);
    assert_eq!(summary.host_count, 2);
    assert_eq!(summary.open_ports.len(), 2);
    assert_eq!(summary.service_count, 2);

    let mut out = Vec::new();
    print_summary(&report, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Scan: tcp (1000 services)"));
    assert!(text.contains("  tcp/22: ssh (4.7p1)"));
    assert!(text.contains("  tcp/80: http\n"));
}

#[test]
fn row_count_matches_findings_and_scripts() {
    let report = report_from(MIXED);
    let expected: usize = report
        .findings
        .iter()
        .map(|f| f.scripts.len().max(1))
        .sum();
    assert_eq!(report.findings.len(), 3);
    assert_eq!(expected, 5);
    assert_eq!(flatten(&report.findings, 100).len(), expected);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.csv");
    write_table(&report, &path, 100).unwrap();
    let rows = csv_rows(&path);
    assert_eq!(rows.len(), expected);
    let script_ids: Vec<_> = rows.iter().map(|r| r[11].to_string()).collect();
    assert_eq!(
        script_ids,
        vec!["", "ssl-cert", "ssl-enum-ciphers", "http-title", ""]
    );
}

#[test]
fn host_without_ports_is_absent_everywhere() {
    let report = report_from(MIXED);
    assert!(report.findings.iter().all(|f| f.host != "192.168.1.5"));
    let summary = Summary::new(&report);
    assert_eq!(summary.host_count, 1);
}

#[test]
fn json_round_trip_preserves_findings() {
    let report = report_from(MIXED);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/summary.json");
    write_document(&report, &path).unwrap();

    let restored = read_document(&path).unwrap();
    assert_eq!(restored.findings.len(), report.findings.len());
    for (a, b) in restored.findings.iter().zip(&report.findings) {
        assert!(a.same_record(b));
        assert_eq!(a.scripts, b.scripts);
    }
    assert_eq!(restored, report);
}

#[test]
fn empty_document_yields_empty_outputs() {
    let report = report_from(r#"<nmaprun><scaninfo protocol="tcp"/></nmaprun>"#);
    assert!(report.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    assert_eq!(
        write_table(&report, &path, 100).unwrap(),
        WriteOutcome::NothingToWrite
    );
    assert!(!path.exists());

    let mut out = Vec::new();
    print_summary(&report, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "No results found\n");
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_document(dir.path().join("nope.xml")).await.unwrap_err();
    assert!(matches!(err, ReportError::NotFound { .. }));
    assert!(err.to_string().contains("nope.xml"));
}

#[tokio::test]
async fn broken_file_is_malformed_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xml");
    std::fs::write(&path, "<nmaprun><host></nmaprun>").unwrap();
    let err = load_document(&path).await.unwrap_err();
    assert!(matches!(err, ReportError::MalformedDocument { .. }));
    assert!(err.to_string().contains("broken.xml"));
}

#[tokio::test]
async fn non_utf8_file_is_malformed_not_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.xml");
    let mut content = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<nmaprun><host><address addr="10.0.0.1"/><hostnames><hostname name="caf"#
        .to_vec();
    content.push(0xe9);
    content.extend_from_slice(br#""/></hostnames></host></nmaprun>"#);
    std::fs::write(&path, content).unwrap();

    let err = load_document(&path).await.unwrap_err();
    assert!(matches!(err, ReportError::MalformedDocument { .. }));
    assert!(err.to_string().contains("latin1.xml"));
}

#[tokio::test]
async fn utf8_bom_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bom.xml");
    let mut content = vec![0xef, 0xbb, 0xbf];
    content.extend_from_slice(b"<nmaprun/>");
    std::fs::write(&path, content).unwrap();

    let tree = load_document(&path).await.unwrap();
    assert_eq!(tree.root.name, "nmaprun");
}

#[tokio::test]
async fn failing_emitter_does_not_stop_the_other() {
    let report = Arc::new(report_from(TWO_HOSTS));
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("summary.json");
    let targets = OutputTargets {
        // An existing directory cannot be replaced by the CSV file.
        table: Some(dir.path().to_path_buf()),
        document: Some(json_path.clone()),
        ..OutputTargets::default()
    };

    let outcomes = run_file_emitters(report, &targets).await;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].kind, EmitterKind::Table);
    assert!(matches!(
        outcomes[0].result,
        Err(ReportError::WriteFailure { .. })
    ));
    assert_eq!(outcomes[1].kind, EmitterKind::Document);
    assert!(outcomes[1].result.is_ok());
    assert!(json_path.exists());
}

#[tokio::test]
async fn no_targets_runs_no_file_emitters() {
    let report = Arc::new(report_from(TWO_HOSTS));
    let outcomes = run_file_emitters(report, &OutputTargets::default()).await;
    assert!(outcomes.is_empty());
}

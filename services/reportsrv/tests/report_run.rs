//! End-to-end pipeline tests: CSV tables through the poller to report files
//!
//! The Modbus transport is replaced with a scripted register source; the
//! rest of the pipeline (loaders, address computation, decoding, rendering)
//! runs for real against a temp directory.

use async_trait::async_trait;
use chrono::Local;
use reportsrv::csv_loader::{load_field_specs, load_identifiers};
use reportsrv::report::{write_category_reports, write_index, IndexEntry};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use trackscan_core::{
    poll_category, AddressingMode, CoreError, DeviceCategory, RegisterSource, RowOutcome,
};

struct ScriptedSource {
    responses: HashMap<(u16, u32), Vec<i32>>,
}

#[async_trait]
impl RegisterSource for ScriptedSource {
    async fn read_registers(
        &mut self,
        unit_id: u16,
        address: u32,
        _count: u16,
    ) -> Result<Vec<i32>, CoreError> {
        self.responses
            .get(&(unit_id, address))
            .cloned()
            .ok_or_else(|| CoreError::transport("illegal data address"))
    }
}

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn csv_tables_to_report_files() {
    let dir = tempfile::tempdir().unwrap();

    let ttids = write_file(dir.path(), "ttids.csv", "ttid\n101\nbogus\n1\n");
    let fields = write_file(
        dir.path(),
        "fields.csv",
        "field,base_register,register_count,codec\n\
         angle,0,2,float32\n\
         flags,2,1,widget\n\
         hole,x,1,uint16\n",
    );

    let identifiers = load_identifiers(&ttids).unwrap();
    assert_eq!(identifiers, vec!["101", "bogus", "1"]);
    let specs = load_field_specs(&fields).unwrap();
    assert_eq!(specs.len(), 3);

    // ttid 101 -> unit 2 addresses 0/2; ttid 1 -> unit 1 addresses 0/2
    let mut source = ScriptedSource {
        responses: HashMap::from([
            ((2, 0), vec![0x4048, -0x0a3d]),
            ((2, 2), vec![0x0001]),
            ((1, 0), vec![0x0000, 0x0000]),
            ((1, 2), vec![0x0000]),
        ]),
    };
    let rows = poll_category(
        "alpha",
        DeviceCategory::Row,
        AddressingMode::Ttid,
        &identifiers,
        &specs,
        &mut source,
    )
    .await;

    // 101: angle + widget + invalid spec; bogus: one row; 1: three rows
    assert_eq!(rows.len(), 7);
    assert_eq!(
        rows[0].outcome,
        RowOutcome::Decoded {
            raw_hex: "4048f5c3".to_string(),
            value: "3.140000104904175".to_string(),
        }
    );
    match &rows[1].outcome {
        RowOutcome::DecodeFailed { diagnostic, .. } => assert!(diagnostic.contains("widget")),
        other => panic!("expected unknown-codec diagnostic, got {:?}", other),
    }
    match &rows[2].outcome {
        RowOutcome::ReadFailed { error } => assert!(error.contains("Invalid field spec")),
        other => panic!("expected invalid field spec, got {:?}", other),
    }
    assert_eq!(rows[3].identifier, "bogus");
    assert!(rows[3].outcome.is_read_failure());

    // grouping order: all of 101, then bogus, then all of 1
    let order: Vec<&str> = rows.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(order, vec!["101", "101", "101", "bogus", "1", "1", "1"]);

    let out = dir.path().join("reports");
    let paths =
        write_category_reports(&out, "alpha", DeviceCategory::Row, &rows, Local::now()).unwrap();
    let csv = fs::read_to_string(&paths.csv).unwrap();
    assert_eq!(csv.lines().count(), 8);
    assert!(csv.lines().nth(1).unwrap().contains("3.140000104904175"));

    let index = write_index(
        &out,
        &[IndexEntry {
            site: "alpha".to_string(),
            category: DeviceCategory::Row,
            html_file: "alpha_row.html".to_string(),
            csv_file: "alpha_row.csv".to_string(),
            row_count: rows.len(),
            error_count: 4,
        }],
        Local::now(),
    )
    .unwrap();
    assert!(fs::read_to_string(index).unwrap().contains("alpha_row.html"));
}

#[tokio::test]
async fn network_position_mode_reads_unit_zero_without_offset() {
    let positions = ["0", "1"];
    let identifiers: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
    let specs = vec![trackscan_core::FieldSpec::new("uptime", 10, 2, "uint32")];

    let mut source = ScriptedSource {
        responses: HashMap::from([
            ((0, 10), vec![0x0000, 0x0e10]),
            ((0, 522), vec![0x0000, 0x1c20]),
        ]),
    };
    let rows = poll_category(
        "alpha",
        DeviceCategory::Network,
        AddressingMode::Position,
        &identifiers,
        &specs,
        &mut source,
    )
    .await;

    assert_eq!(rows[0].unit_id, Some(0));
    assert_eq!(rows[0].start_address, Some(10));
    assert_eq!(rows[1].start_address, Some(512 + 10));
    assert_eq!(
        rows[0].outcome,
        RowOutcome::Decoded {
            raw_hex: "00000e10".to_string(),
            value: "3600".to_string(),
        }
    );
    assert_eq!(
        rows[1].outcome,
        RowOutcome::Decoded {
            raw_hex: "00001c20".to_string(),
            value: "7200".to_string(),
        }
    );
}

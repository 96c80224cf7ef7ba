// ==========================================
// 派工结果传播集成测试
// ==========================================
// 测试目标: 派工输出 → 拆分任务补齐 / 同组补齐
// ==========================================


use workforce_aps::config::{AssignSettings, FileFormat};
use workforce_aps::domain::AssignmentOutput;
use workforce_aps::engine::{
    fill_resource_by_group, fill_splits_from_assignment, AssignmentEngine, AssignmentRequest,
    OutputTarget,
};
use workforce_aps::importer::{ExtractSource, UniversalFileParser};
use test_helpers::csv_bytes;

#[test]
fn test_assignment_output_feeds_split_tasks() {
    let mut request = AssignmentRequest::new(
        ExtractSource::bytes(
            "task_lines.csv",
            csv_bytes(
                &["Ligne planche", "Jour", "Qualif", "Vacation"],
                &[&["10", "03/02/2025", "A", "S1"], &["11", "03/02/2025", "A", "S1"]],
            ),
        ),
        OutputTarget::Bytes,
    );
    request.attendance = Some(ExtractSource::bytes(
        "attendance.csv",
        csv_bytes(
            &["Date", "Ressource", "Shift"],
            &[&["03/02/2025", "Anne", "S1"], &["03/02/2025", "Bob", "S1"]],
        ),
    ));
    request.competencies = Some(ExtractSource::bytes(
        "competencies.csv",
        csv_bytes(&["Nom", "Compétences"], &[&["Anne", "A"], &["Bob", "A"]]),
    ));

    let settings = AssignSettings::default();
    let output_column = settings.output_column.clone();
    let report = AssignmentEngine::new(settings).unwrap().run(&request).unwrap();
    let AssignmentOutput::Bytes(bytes) = report.output else {
        panic!("expected bytes output");
    };

    let parser = UniversalFileParser::new(FileFormat::default());
    let assigned = parser.parse_named("task_lines_out.csv", &bytes).unwrap();

    let splits = parser
        .parse_named(
            "task_splits.csv",
            &csv_bytes(
                &["N° ligne planche", "Ressource", "Poste"],
                &[
                    &["10", "", "P1"],
                    &["10", "", "P2"],
                    &["11", "Chloé", "P1"],
                    &["12", "", "P1"],
                ],
            ),
        )
        .unwrap();

    let filled = fill_splits_from_assignment(&splits, &assigned, &output_column);
    assert_eq!(filled.cell(0, 1), "Anne");
    assert_eq!(filled.cell(1, 1), "Anne");
    assert_eq!(filled.cell(2, 1), "Chloé");
    assert_eq!(filled.cell(3, 1), "");
}

#[test]
fn test_group_fill_after_partial_manual_entry() {
    let parser = UniversalFileParser::new(FileFormat::default());
    let table = parser
        .parse_named(
            "task_splits.csv",
            &csv_bytes(
                &["Ligne / Planche", "Ressource"],
                &[&["7", ""], &["7", "Bob"], &["8", ""]],
            ),
        )
        .unwrap();

    let filled = fill_resource_by_group(&table);
    assert_eq!(filled.cell(0, 1), "Bob");
    assert_eq!(filled.cell(2, 1), "");
    assert_eq!(filled.headers, table.headers);
}

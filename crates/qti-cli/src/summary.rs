use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use qti_cli::pipeline::{ExportRun, InspectedQuestion};
use qti_output::SkipReason;

pub fn print_export_summary(run: &ExportRun) {
    let summary = &run.summary;
    println!("Archive: {}", run.archive.display());
    println!(
        "Questions: {} read, {} exported, {} skipped",
        run.questions,
        summary.emitted.len(),
        summary.skipped.len()
    );

    let mut table = question_table();

    for item in &summary.emitted {
        table.add_row(vec![
            Cell::new(item.question_id),
            Cell::new(&item.title),
            Cell::new(&item.qtype),
            status_cell(None),
            Cell::new(item.max_score),
            count_cell(item.assets),
            dim_cell(&item.path),
        ]);
    }
    for skipped in &summary.skipped {
        table.add_row(vec![
            Cell::new(skipped.question_id),
            Cell::new(&skipped.name),
            Cell::new(&skipped.qtype),
            status_cell(Some(&skipped.reason)),
            dim_cell("-"),
            dim_cell("-"),
            Cell::new(skipped.reason.to_string()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(summary.emitted.iter().map(|item| item.max_score).sum::<f64>())
            .add_attribute(Attribute::Bold),
        count_cell(summary.asset_count()).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");

    if summary.unresolved_references > 0 {
        eprintln!(
            "Warning: {} embedded file reference(s) could not be read and were left unchanged",
            summary.unresolved_references
        );
    }
}

pub fn print_inspection(questions: &[InspectedQuestion]) {
    let mut table = question_table();

    let mut exportable = 0usize;
    for question in questions {
        let (status, score, detail) = match &question.status {
            Ok(score) => {
                exportable += 1;
                (status_cell(None), Cell::new(score), dim_cell("-"))
            }
            Err(reason) => (
                status_cell(Some(reason)),
                dim_cell("-"),
                Cell::new(reason.to_string()),
            ),
        };
        table.add_row(vec![
            Cell::new(question.id),
            Cell::new(&question.name),
            Cell::new(&question.qtype),
            status,
            score,
            count_cell(question.files),
            detail,
        ]);
    }
    println!("{table}");
    println!("{exportable} of {} question(s) can be exported", questions.len());
}

/// One row per question: ID, name, type, status, score, files, detail.
fn question_table() -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Name"),
        header_cell("Type"),
        header_cell("Status"),
        header_cell("Score"),
        header_cell("Files"),
        header_cell("Detail"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
    if table.column_count() >= 7 {
        table.set_constraints(vec![
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::UpperBoundary(Width::Fixed(13)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Percentage(40)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

/// `None` means exported.
fn status_cell(skip: Option<&SkipReason>) -> Cell {
    match skip {
        None => Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        Some(SkipReason::UnsupportedType(_)) => dim_cell("SKIP"),
        Some(_) => Cell::new("SKIP").fg(Color::Yellow),
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

//! Terminal summary of a decision

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use decision_engine::Decision;

/// Signal table followed by the decision line
pub fn render(decision: &Decision) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Domain", "Direction", "Confidence", "Note"]);

    for signal in &decision.signal_table {
        let note = signal
            .fallback
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(signal.domain),
            Cell::new(signal.direction),
            Cell::new(format!("{:.1}", signal.confidence)),
            Cell::new(note),
        ]);
    }

    format!(
        "{table}\nnet confidence diff {:+.2}\n{}",
        decision.debate.net_confidence_diff,
        decision.summary()
    )
}

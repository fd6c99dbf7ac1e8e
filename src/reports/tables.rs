use crate::cmd::crack::Hit;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use maskforge::charset::{class_members, Encoding};
use maskforge::engine::{node_share, NodeSpec};
use maskforge::mask::RangeId;
use maskforge::{MaskResult, MaskSession};
use std::collections::HashSet;
use strum::IntoEnumIterator;

const PREVIEW_LEN: usize = 32;

fn printable(encoding: Encoding, bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match encoding.decode_byte(b) {
            Some(c) if !c.is_control() => c.to_string(),
            _ => format!("\\x{:02x}", b),
        })
        .collect()
}

fn preview(encoding: Encoding, members: &[u8]) -> String {
    let mut text = printable(encoding, &members[..members.len().min(PREVIEW_LEN)]);
    if members.len() > PREVIEW_LEN {
        text.push_str("...");
    }
    text
}

pub fn summary(session: &MaskSession) {
    let encoding = session.options().encoding;
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut row = |name: &str, value: String| {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(value),
        ]);
    };

    row("Pattern", session.pattern().display());
    row(
        "Template",
        printable(encoding, session.template().key.as_bytes()),
    );
    row("Encoding", encoding.to_string());
    row("Effective length", session.effective_length().to_string());
    row("Max length", session.max_length().to_string());
    row(
        "Ranges",
        format!(
            "{} ({} driven here)",
            session.chain().len(),
            session.chain().active_len()
        ),
    );
    row("Candidates", session.budget().total.to_string());
    if session.chain().internal_total() > 1 {
        row(
            "Consumer multiplier",
            session.chain().internal_total().to_string(),
        );
    }
    if let Some(node) = session.options().node {
        row("Node", node.to_string());
    }
    if let Some(budget) = session.parent_length_budget() {
        row(
            "Parent word lengths",
            format!("{}..={}", budget.min.unwrap_or(0), budget.max),
        );
    }
    row("Fingerprint", session.pattern_id().hash.clone());

    println!("\n{}", table);
}

pub fn ranges(session: &MaskSession) {
    let chain = session.chain();
    if chain.is_empty() {
        println!("\nNo variable positions.");
        return;
    }
    let encoding = session.options().encoding;
    let linked: HashSet<RangeId> = chain.iter().collect();
    let positioned = session.template().positioned;

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Pos"),
        Cell::new("Size").fg(Color::Cyan),
        Cell::new("Run"),
        Cell::new("Driver"),
        Cell::new("Members"),
    ]);
    for i in 0..3 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for (i, range) in chain.ranges().iter().enumerate() {
        let id = RangeId(i);
        let (driver, color) = if linked.contains(&id) {
            ("odometer", Color::Green)
        } else if !chain.is_enabled(id) {
            ("consumer", Color::Yellow)
        } else {
            ("truncated", Color::Red)
        };
        let position = if i < positioned {
            range.key_position.to_string()
        } else {
            "-".to_string()
        };
        let run = match range.start {
            Some(start) => printable(encoding, &[start]),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(i),
            Cell::new(position),
            Cell::new(range.len()).fg(Color::Cyan),
            Cell::new(run),
            Cell::new(driver).fg(color),
            Cell::new(preview(encoding, &range.members)),
        ]);
    }
    println!("\n{}", table);
}

pub fn node_shares(total: u64, count: u32) -> MaskResult<()> {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(vec![
        Cell::new("Node").add_attribute(Attribute::Bold),
        Cell::new("Offset"),
        Cell::new("Candidates").fg(Color::Cyan),
    ]);
    for i in 1..3 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for n in 1..=count {
        let node = NodeSpec::single(n, count)?;
        let (offset, share) = match node_share(total, node) {
            Ok(share) => (share.offset.to_string(), share.count),
            Err(_) => ("-".to_string(), 0),
        };
        let cell = Cell::new(share);
        table.add_row(vec![
            Cell::new(node),
            Cell::new(offset),
            if share == 0 { cell.fg(Color::Red) } else { cell },
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn hits(hits: &[Hit], encoding: Encoding) {
    if hits.is_empty() {
        println!("\nNothing found.");
        return;
    }
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(vec![
        Cell::new("Target").add_attribute(Attribute::Bold),
        Cell::new("Candidate").fg(Color::Green),
        Cell::new("Node"),
        Cell::new("Worker"),
    ]);
    for hit in hits {
        table.add_row(vec![
            Cell::new(&hit.label),
            Cell::new(printable(encoding, &hit.candidate)).fg(Color::Green),
            Cell::new(hit.node.map_or_else(|| "-".to_string(), |n| n.to_string())),
            Cell::new(hit.worker),
        ]);
    }
    println!("\n{}", table);
}

pub fn encodings() {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(vec![
        Cell::new("Encoding").add_attribute(Attribute::Bold),
        Cell::new("?L"),
        Cell::new("?U"),
        Cell::new("?D"),
        Cell::new("?S"),
    ]);
    for i in 1..5 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for encoding in Encoding::iter() {
        let mut cells = vec![Cell::new(encoding)];
        for symbol in [b'L', b'U', b'D', b'S'] {
            cells.push(match class_members(symbol, encoding, true) {
                Ok(members) => Cell::new(members.len()),
                Err(_) => Cell::new("-").fg(Color::DarkGrey),
            });
        }
        table.add_row(cells);
    }
    println!("\n{}", table);
}

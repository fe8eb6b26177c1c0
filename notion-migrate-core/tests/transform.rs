use notion_migrate_core::batch::paginate;
use notion_migrate_core::block::{count_blocks, Block, BlockKind};
use notion_migrate_core::config::Limits;
use notion_migrate_core::filter::filter_unsupported;
use notion_migrate_core::migrate::prepare_blocks;
use notion_migrate_core::partition::partition;
use notion_migrate_core::path::StructuralPath;
use notion_migrate_core::placeholder::{table_width, MandatoryChildren};
use notion_migrate_core::split::{chunk_text, split_oversized};
use serde_json::{json, Map, Value};

fn unsupported() -> Block {
    Block::new(BlockKind::Unsupported, Map::new())
}

fn toggle(children: Vec<Block>) -> Block {
    Block::text_leaf(BlockKind::Toggle, "toggle").with_children(children)
}

fn table_row(cells: &[&str]) -> Block {
    let cells: Vec<Value> = cells
        .iter()
        .map(|c| json!([{ "type": "text", "text": { "content": c } }]))
        .collect();
    let mut payload = Map::new();
    payload.insert("cells".into(), Value::Array(cells));
    Block::new(BlockKind::TableRow, payload)
}

fn table(rows: Vec<Block>) -> Block {
    let mut payload = Map::new();
    payload.insert("table_width".into(), json!(4));
    Block::new(BlockKind::Table, payload).with_children(rows)
}

fn text_of(block: &Block) -> &str {
    block.single_text().unwrap_or_default()
}

#[test]
fn filter_removes_unsupported_at_every_depth() {
    let tree = vec![
        Block::paragraph("a"),
        unsupported(),
        toggle(vec![Block::paragraph("b"), unsupported(), toggle(vec![unsupported()])]),
    ];

    let filtered = filter_unsupported(tree);

    assert_eq!(filtered.removed, 3);
    assert_eq!(filtered.blocks.len(), 2);
    let toggle_children = filtered.blocks[1].children.as_ref().unwrap();
    assert_eq!(toggle_children.len(), 2);
    assert_eq!(toggle_children[1].children.as_ref().unwrap().len(), 0);
}

#[test]
fn filter_counts_unsupported_nested_in_removed_block() {
    let nested = unsupported().with_children(vec![unsupported(), Block::paragraph("lost")]);

    let filtered = filter_unsupported(vec![nested]);

    assert_eq!(filtered.removed, 2);
    assert!(filtered.blocks.is_empty());
}

#[test]
fn filter_counter_does_not_leak_between_calls() {
    let first = filter_unsupported(vec![unsupported(), unsupported()]);
    let second = filter_unsupported(vec![unsupported()]);

    assert_eq!(first.removed, 2);
    assert_eq!(second.removed, 1);
}

#[test]
fn split_code_block_of_4500_chars_into_three() {
    let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let block = Block::code(&text, "rust");

    let split = split_oversized(vec![block], 2000);

    assert_eq!(split.split_leaves, 1);
    let lengths: Vec<usize> = split
        .blocks
        .iter()
        .map(|b| text_of(b).chars().count())
        .collect();
    assert_eq!(lengths, vec![2000, 2000, 500]);
    for block in &split.blocks {
        assert_eq!(block.kind, BlockKind::Code);
        assert_eq!(block.payload.get("language"), Some(&json!("rust")));
    }
    let joined: String = split.blocks.iter().map(text_of).collect();
    assert_eq!(joined, text);
}

#[test]
fn split_keeps_short_and_non_text_blocks() {
    let mut equation = Map::new();
    equation.insert("expression".into(), json!("e".repeat(50)));
    let tree = vec![
        Block::paragraph("short"),
        Block::new(BlockKind::Equation, equation),
        Block::text_leaf(BlockKind::Toggle, &"t".repeat(50))
            .with_children(vec![Block::paragraph("kid")]),
    ];

    let split = split_oversized(tree.clone(), 10);

    assert_eq!(split.split_leaves, 0);
    assert_eq!(split.blocks, tree);
}

#[test]
fn split_covers_every_text_leaf_kind() {
    let kinds = [
        BlockKind::ToDo,
        BlockKind::Callout,
        BlockKind::Toggle,
        BlockKind::Heading1,
        BlockKind::Heading2,
        BlockKind::Heading3,
    ];
    for kind in kinds {
        let block = Block::text_leaf(kind.clone(), &"z".repeat(4500));

        let split = split_oversized(vec![block], 2000);

        assert_eq!(split.blocks.len(), 3, "{kind}");
        assert!(split.blocks.iter().all(|b| b.kind == kind));
        let lengths: Vec<usize> = split.blocks.iter().map(|b| text_of(b).len()).collect();
        assert_eq!(lengths, vec![2000, 2000, 500], "{kind}");
    }
}

#[test]
fn split_to_do_continuations_keep_checked_state() {
    let mut block = Block::text_leaf(BlockKind::ToDo, &"z".repeat(25));
    block.payload.insert("checked".into(), json!(true));

    let split = split_oversized(vec![block], 10);

    assert_eq!(split.blocks.len(), 3);
    assert!(split.blocks.iter().all(|b| b.payload["checked"] == json!(true)));
}

#[test]
fn split_recurses_into_children_and_stays_in_place() {
    let tree = vec![toggle(vec![
        Block::paragraph("before"),
        Block::text_leaf(BlockKind::Quote, "abcdefghij"),
        Block::paragraph("after"),
    ])];

    let split = split_oversized(tree, 4);

    let children = split.blocks[0].children.as_ref().unwrap();
    let texts: Vec<&str> = children.iter().map(text_of).collect();
    // "before" and "after" are longer than 4 too.
    assert_eq!(
        texts,
        vec!["befo", "re", "abcd", "efgh", "ij", "afte", "r"]
    );
    assert_eq!(children[2].kind, BlockKind::Quote);
    assert_eq!(children[4].kind, BlockKind::Quote);
    assert_eq!(split.split_leaves, 3);
}

#[test]
fn split_counts_characters_not_bytes() {
    let text = "é".repeat(5);
    assert_eq!(chunk_text(&text, 2), vec!["éé", "éé", "é"]);
}

fn segment_texts(block: &Block) -> Vec<String> {
    block
        .rich_text()
        .unwrap_or_default()
        .iter()
        .map(|s| s["text"]["content"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn split_cuts_long_segment_among_several_and_keeps_annotations() {
    let long = "a".repeat(4500);
    let mut block = Block::paragraph("x");
    block.payload.insert(
        "rich_text".into(),
        json!([
            { "type": "text", "text": { "content": "see " } },
            {
                "type": "text",
                "text": { "content": long, "link": { "url": "https://example.com" } },
                "annotations": { "bold": true }
            },
            { "type": "text", "text": { "content": " end" } }
        ]),
    );

    let split = split_oversized(vec![block], 2000);

    assert_eq!(split.split_leaves, 1);
    assert_eq!(split.blocks.len(), 3);
    for block in &split.blocks {
        assert_eq!(block.kind, BlockKind::Paragraph);
        let total: usize = segment_texts(block).iter().map(|t| t.chars().count()).sum();
        assert!(total <= 2000, "block text of {total} chars");
    }
    assert_eq!(segment_texts(&split.blocks[0])[0], "see ");
    assert_eq!(segment_texts(&split.blocks[0])[1].len(), 1996);
    assert_eq!(segment_texts(&split.blocks[1]), vec!["a".repeat(2000)]);
    assert_eq!(segment_texts(&split.blocks[2]), vec!["a".repeat(504), " end".to_string()]);

    let pieces: Vec<&Value> = split
        .blocks
        .iter()
        .flat_map(|b| b.rich_text().unwrap_or_default())
        .filter(|s| s["text"]["content"].as_str().is_some_and(|t| t.starts_with('a')))
        .collect();
    assert_eq!(pieces.len(), 3);
    for piece in pieces {
        assert_eq!(piece["annotations"]["bold"], json!(true));
        assert_eq!(piece["text"]["link"]["url"], json!("https://example.com"));
    }

    let joined: String = split.blocks.iter().flat_map(segment_texts).collect();
    assert_eq!(joined, format!("see {long} end"));
}

#[test]
fn split_keeps_mentions_whole() {
    let mut block = Block::paragraph("x");
    block.payload.insert(
        "rich_text".into(),
        json!([
            { "type": "text", "text": { "content": "b".repeat(15) } },
            { "type": "mention", "mention": { "type": "user", "user": { "id": "u1" } } }
        ]),
    );

    let split = split_oversized(vec![block], 10);

    assert_eq!(split.blocks.len(), 2);
    let last = split.blocks[1].rich_text().unwrap();
    assert_eq!(last.len(), 2);
    assert_eq!(last[0]["text"]["content"], json!("bbbbb"));
    assert_eq!(last[1]["type"], json!("mention"));
}

#[test]
fn partition_table_at_last_level_gets_placeholder_row() {
    let rows = vec![
        table_row(&["a", "b", "c", "d"]),
        table_row(&["e", "f", "g", "h"]),
        table_row(&["i", "j", "k", "l"]),
    ];
    let tree = vec![toggle(vec![table(rows.clone())])];

    let partitioned = partition(tree, 2);

    let table_path = StructuralPath::from(vec![0, 0]);
    assert_eq!(partitioned.truncated_paths(), vec![table_path.clone()]);
    assert_eq!(partitioned.deferred[&table_path], rows);

    let pruned_table = &partitioned.blocks[0].children.as_ref().unwrap()[0];
    assert!(pruned_table.has_children);
    let placeholder = pruned_table.children.as_ref().unwrap();
    assert_eq!(placeholder.len(), 1);
    assert_eq!(placeholder[0].kind, BlockKind::TableRow);
    let cells = placeholder[0].payload["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 4);
    assert!(cells.iter().all(|c| c.as_array().is_some_and(Vec::is_empty)));
}

#[test]
fn partition_column_list_gets_single_empty_column() {
    let columns = vec![
        Block::new(BlockKind::Column, Map::new()).with_children(vec![Block::paragraph("left")]),
        Block::new(BlockKind::Column, Map::new()).with_children(vec![Block::paragraph("right")]),
    ];
    let column_list = Block::new(BlockKind::ColumnList, Map::new()).with_children(columns.clone());

    let partitioned = partition(vec![column_list], 1);

    let placeholder = partitioned.blocks[0].children.as_ref().unwrap();
    assert_eq!(placeholder.len(), 1);
    assert_eq!(placeholder[0].kind, BlockKind::Column);
    assert_eq!(placeholder[0].children, Some(Vec::new()));
    assert_eq!(partitioned.deferred[&StructuralPath::from(vec![0])], columns);
}

#[test]
fn partition_plain_container_loses_children_attribute() {
    let tree = vec![toggle(vec![toggle(vec![Block::paragraph("deep")])])];

    let partitioned = partition(tree, 2);

    let inner = &partitioned.blocks[0].children.as_ref().unwrap()[0];
    assert_eq!(inner.children, None);
    assert!(inner.has_children);
    assert_eq!(
        partitioned.deferred[&StructuralPath::from(vec![0, 0])],
        vec![Block::paragraph("deep")]
    );
}

#[test]
fn partition_keeps_shallow_trees_untouched() {
    let tree = vec![
        Block::paragraph("a"),
        toggle(vec![Block::paragraph("b"), Block::paragraph("c")]),
    ];

    let partitioned = partition(tree.clone(), 2);

    assert!(partitioned.deferred.is_empty());
    assert_eq!(partitioned.blocks, tree);
}

#[test]
fn partition_conserves_every_block() {
    let tree = vec![
        toggle(vec![
            toggle(vec![toggle(vec![Block::paragraph("x")]), Block::paragraph("y")]),
            table(vec![table_row(&["1"]), table_row(&["2"])]),
        ]),
        Block::paragraph("z"),
    ];
    let before = count_blocks(&tree);

    let partitioned = partition(tree, 2);

    // One placeholder row was synthesized for the table.
    let deferred: usize = partitioned.deferred.values().map(|b| count_blocks(b)).sum();
    assert_eq!(count_blocks(&partitioned.blocks) - 1 + deferred, before);
}

#[test]
fn table_width_defaults_to_one_without_first_row() {
    assert_eq!(table_width(&[]), 1);
    let rows = MandatoryChildren::Table.minimal_children(&[]);
    assert_eq!(rows[0].payload["cells"].as_array().unwrap().len(), 1);
    assert_eq!(MandatoryChildren::for_kind(&BlockKind::Toggle), None);
    assert!(MandatoryChildren::EmptyList.minimal_children(&[]).is_empty());
}

#[test]
fn paginate_150_blocks_into_100_and_50() {
    let blocks: Vec<Block> = (0..150).map(|i| Block::paragraph(&i.to_string())).collect();

    let batches = paginate(blocks, 100);

    assert_eq!(batches.first.len(), 100);
    assert_eq!(batches.overflow.len(), 1);
    assert_eq!(batches.overflow[0].len(), 50);
    assert_eq!(text_of(&batches.overflow[0][0]), "100");
}

#[test]
fn paginate_empty_and_exact_inputs() {
    let empty = paginate(Vec::<u8>::new(), 100);
    assert!(empty.first.is_empty());
    assert!(empty.overflow.is_empty());

    let exact = paginate(vec![0u8; 200], 100);
    assert_eq!(exact.first.len(), 100);
    assert_eq!(exact.overflow_len(), 100);
    assert_eq!(exact.into_batches().len(), 2);
}

#[test]
fn prepare_runs_every_stage_in_order() {
    let mut tree: Vec<Block> = (0..120).map(|i| Block::paragraph(&i.to_string())).collect();
    tree.insert(0, unsupported());
    tree.push(Block::code(&"c".repeat(4500), "python"));
    tree.push(toggle(vec![toggle(vec![Block::paragraph("deep")])]));

    let prepared = prepare_blocks(tree, &Limits::default());

    assert_eq!(prepared.removed_unsupported, 1);
    assert_eq!(prepared.split_leaves, 1);
    // 120 paragraphs + 3 code chunks + 1 toggle.
    assert_eq!(prepared.initial.len(), 100);
    assert_eq!(prepared.overflow.len(), 1);
    assert_eq!(prepared.overflow[0].len(), 24);
    assert_eq!(
        prepared.truncated_paths(),
        vec![StructuralPath::from(vec![123, 0])]
    );
    assert_eq!(prepared.deferred_blocks(), 1);
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Emitter (`spec.md` §4.7): deterministic text rendering of the linked
//! program into three artifacts — Rust program source, a TOML project
//! manifest, and a YAML connectors manifest.
//!
//! Emission is byte-stable: a single counter, shared by every
//! `reader__N`/`filename__N`/`aggregator__N`/`Transformer__N` identifier,
//! is walked once in a fixed order (`spec.md` §4.7, §9 "Deterministic
//! numbering"). Nothing here reads wall-clock time, randomness, or hash-map
//! iteration order for anything that ends up in the rendered text.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::ast::{AggKind, ArithOp, BoolOp, CompareOp, Literal};
use crate::connector_registry;
use crate::dictionary::{DataDictionary, StreamDefinition, TypeTag};
use crate::ir::{ColumnRef, FilterExpr, Slot, TransformerIr};
use crate::linker::SyncPlan;
use crate::semantic::OpenEndpoint;

pub struct EmittedProgram {
    pub code: String,
    pub project_file: String,
    pub connectors: String,
}

/// Shared monotonic counter for every numbered identifier the emitter
/// produces, advanced in emission order (`spec.md` §9).
#[derive(Default)]
struct IdGen(u32);

impl IdGen {
    fn next(&mut self, prefix: &str) -> String {
        self.0 += 1;
        format!("{prefix}__{}", self.0)
    }
}

/// Renders the whole program. `opens` must already carry network-rewritten
/// connection strings for any `Network` endpoint (`spec.md` §4.6).
pub fn emit(
    transformers: &[TransformerIr],
    plans: &[SyncPlan],
    opens: &[OpenEndpoint],
    dicts: &[(String, Rc<DataDictionary>)],
) -> EmittedProgram {
    let mut ids = IdGen::default();
    let mut code = String::new();

    writeln!(code, "// Generated by pansqlc. Do not edit by hand.").unwrap();
    writeln!(code, "#![allow(non_snake_case, unused)]").unwrap();
    writeln!(code).unwrap();

    emit_dictionary_blobs(&mut code, dicts);
    writeln!(code).unwrap();

    // One struct per transformer IR, each assigned a numbered type name
    // before any of its fields/methods are rendered, so `Transformer__N`
    // numbering always precedes the `aggregator__N` fields it declares.
    let mut transformer_names = Vec::with_capacity(transformers.len());
    for ir in transformers {
        transformer_names.push(ids.next("Transformer"));
    }
    for (ir, name) in transformers.iter().zip(&transformer_names) {
        emit_transformer(&mut code, &mut ids, ir, name);
        writeln!(code).unwrap();
    }

    emit_sync_struct(&mut code, transformers, &transformer_names, plans);
    writeln!(code).unwrap();

    emit_main(&mut code, &mut ids, opens, dicts, plans);

    let connector_names = referenced_connectors(opens);
    EmittedProgram {
        code,
        project_file: render_project_manifest(&connector_names),
        connectors: render_connectors_manifest(&connector_names),
    }
}

fn emit_dictionary_blobs(code: &mut String, dicts: &[(String, Rc<DataDictionary>)]) {
    for (name, dict) in dicts {
        let blob = crate::dictionary::compress_blob(dict);
        writeln!(
            code,
            "const DICT_{}: &[u8] = &{};",
            name.to_ascii_uppercase(),
            format_byte_array(&blob)
        )
        .unwrap();
    }
}

fn format_byte_array(bytes: &[u8]) -> String {
    let mut s = String::from("[");
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        write!(s, "0x{b:02x}").unwrap();
    }
    s.push(']');
    s
}

fn referenced_connectors(opens: &[OpenEndpoint]) -> Vec<String> {
    let set: BTreeSet<String> = opens.iter().map(|o| o.connector.clone()).collect();
    set.into_iter().collect()
}

// --- Per-transformer struct ------------------------------------------------

fn emit_transformer(code: &mut String, ids: &mut IdGen, ir: &TransformerIr, name: &str) {
    writeln!(code, "/// Lowered from `select ... into {}`.", ir.into_name).unwrap();
    writeln!(code, "pub struct {name} {{").unwrap();
    if ir.source_is_table {
        writeln!(
            code,
            "    table: std::rc::Rc<std::cell::RefCell<std::collections::HashMap<pansql_runtime::Key, pansql_runtime::Row>>>,"
        )
        .unwrap();
    } else {
        if let Some(join) = &ir.join {
            let _ = join;
            writeln!(
                code,
                "    table: std::rc::Rc<std::cell::RefCell<std::collections::HashMap<pansql_runtime::Key, pansql_runtime::Row>>>,"
            )
            .unwrap();
        }
        if let Some(agg) = &ir.aggregation {
            for a in &agg.aggregators {
                let field = ids.next("aggregator");
                writeln!(
                    code,
                    "    {field}: pansql_runtime::aggregator::{}Combinator,",
                    agg_kind_type(a.kind)
                )
                .unwrap();
            }
        } else {
            // Non-aggregating transformers call `advance()` once per row, so
            // a literal projection slot is hoisted into a struct field set
            // once in the constructor rather than re-built on every call
            // (`spec.md` §4.4 "Constant-hoist set").
            for (i, slot) in ir.slots.iter().enumerate() {
                if matches!(slot, Slot::ConstLiteral { .. }) {
                    writeln!(code, "    const_field_{i}: pansql_runtime::Value,").unwrap();
                }
            }
        }
    }
    writeln!(code, "}}").unwrap();
    writeln!(code).unwrap();

    writeln!(code, "impl {name} {{").unwrap();
    emit_constructor(code, ir);
    writeln!(code).unwrap();
    if ir.source_is_table {
        emit_bootstrap_advance(code, ir);
    } else if ir.aggregation.is_some() {
        emit_aggregating_advance(code, ir);
    } else {
        emit_row_advance(code, ir);
    }
    writeln!(code, "}}").unwrap();
    writeln!(code).unwrap();

    writeln!(code, "impl pansql_runtime::StreamTransformer for {name} {{").unwrap();
    writeln!(code, "    fn advance(&mut self, row: pansql_runtime::Row) -> Option<pansql_runtime::Row> {{").unwrap();
    writeln!(code, "        {name}::advance(self, row)").unwrap();
    writeln!(code, "    }}").unwrap();
    if ir.aggregation.is_some() {
        writeln!(code, "    fn finalize(&mut self) -> Vec<pansql_runtime::Row> {{").unwrap();
        writeln!(code, "        {name}::finalize(self)").unwrap();
        writeln!(code, "    }}").unwrap();
    }
    writeln!(code, "}}").unwrap();
}

fn emit_constructor(code: &mut String, ir: &TransformerIr) {
    writeln!(
        code,
        "    pub fn new(table: std::rc::Rc<std::cell::RefCell<std::collections::HashMap<pansql_runtime::Key, pansql_runtime::Row>>>) -> Self {{"
    )
    .unwrap();
    if ir.source_is_table {
        writeln!(code, "        Self {{ table }}").unwrap();
    } else if let Some(agg) = &ir.aggregation {
        writeln!(code, "        Self {{").unwrap();
        if ir.join.is_some() {
            writeln!(code, "            table,").unwrap();
        }
        for (i, a) in agg.aggregators.iter().enumerate() {
            writeln!(
                code,
                "            aggregator__{}: pansql_runtime::aggregator::{}Combinator::new(),",
                i + 1,
                agg_kind_type(a.kind)
            )
            .unwrap();
        }
        writeln!(code, "        }}").unwrap();
    } else {
        let const_fields: Vec<(usize, &Literal)> = ir
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Slot::ConstLiteral { value, .. } => Some((i, value)),
                _ => None,
            })
            .collect();
        if ir.join.is_some() {
            writeln!(code, "        Self {{").unwrap();
            writeln!(code, "            table,").unwrap();
            for (i, value) in &const_fields {
                writeln!(code, "            const_field_{i}: {},", render_literal(value)).unwrap();
            }
            writeln!(code, "        }}").unwrap();
        } else if const_fields.is_empty() {
            writeln!(code, "        let _ = table;").unwrap();
            writeln!(code, "        Self {{}}").unwrap();
        } else {
            writeln!(code, "        let _ = table;").unwrap();
            writeln!(code, "        Self {{").unwrap();
            for (i, value) in &const_fields {
                writeln!(code, "            const_field_{i}: {},", render_literal(value)).unwrap();
            }
            writeln!(code, "        }}").unwrap();
        }
    }
    writeln!(code, "    }}").unwrap();
}

fn emit_bootstrap_advance(code: &mut String, ir: &TransformerIr) {
    // Table-declared inputs only populate the shared index; they never
    // yield a row downstream (`spec.md` §4.4 "Table-declared inputs").
    let key_idx = ir.source_stream.primary_key.first().and_then(|pk| ir.source_stream.field_index(pk)).unwrap_or(0);
    writeln!(code, "    pub fn advance(&mut self, row: pansql_runtime::Row) -> Option<pansql_runtime::Row> {{").unwrap();
    writeln!(code, "        let key = row.key_at({key_idx});").unwrap();
    writeln!(code, "        self.table.borrow_mut().insert(key, row);").unwrap();
    writeln!(code, "        None").unwrap();
    writeln!(code, "    }}").unwrap();
}

fn emit_row_advance(code: &mut String, ir: &TransformerIr) {
    writeln!(code, "    pub fn advance(&mut self, row: pansql_runtime::Row) -> Option<pansql_runtime::Row> {{").unwrap();
    if let Some(filter) = &ir.filter {
        writeln!(code, "        if !({}) {{", render_filter(filter, "row", "joined")).unwrap();
        writeln!(code, "            return None;").unwrap();
        writeln!(code, "        }}").unwrap();
    }
    if let Some(join) = &ir.join {
        writeln!(
            code,
            "        let probe = row.key_at({});",
            join.from_probe_index
        )
        .unwrap();
        writeln!(code, "        let table = self.table.borrow();").unwrap();
        writeln!(code, "        let joined = match table.get(&probe) {{").unwrap();
        writeln!(code, "            Some(r) => r,").unwrap();
        writeln!(code, "            None => return None,").unwrap();
        writeln!(code, "        }};").unwrap();
    }
    writeln!(code, "        Some(pansql_runtime::Row::from(vec![").unwrap();
    for (i, slot) in ir.slots.iter().enumerate() {
        writeln!(code, "            {},", render_slot_value(slot, i, "row", "joined")).unwrap();
    }
    writeln!(code, "        ]))").unwrap();
    writeln!(code, "    }}").unwrap();
}

fn emit_aggregating_advance(code: &mut String, ir: &TransformerIr) {
    let agg = ir.aggregation.as_ref().unwrap();
    writeln!(code, "    pub fn advance(&mut self, row: pansql_runtime::Row) -> Option<pansql_runtime::Row> {{").unwrap();
    let key_exprs: Vec<String> = agg
        .group_by
        .iter()
        .map(|idx| format!("row.{}({idx})", accessor(&ir.source_stream, *idx)))
        .collect();
    writeln!(code, "        let key = ({},);", key_exprs.join(", ")).unwrap();
    for (i, a) in agg.aggregators.iter().enumerate() {
        let value_expr = match a.source_index {
            Some(idx) => format!("row.{}({idx})", accessor(&ir.source_stream, idx)),
            None => "1".to_string(),
        };
        writeln!(code, "        self.aggregator__{}.accumulate(key.clone(), {value_expr});", i + 1).unwrap();
    }
    writeln!(code, "        None").unwrap();
    writeln!(code, "    }}").unwrap();
    writeln!(code).unwrap();

    writeln!(code, "    pub fn finalize(&mut self) -> Vec<pansql_runtime::Row> {{").unwrap();
    writeln!(code, "        let mut rows = Vec::new();").unwrap();
    // A literal projection slot is invariant across every group, so it is
    // assigned once here, above the group loop, rather than rebuilt once
    // per group (`spec.md` §4.4 "Constant-hoist set", scenario G).
    for (i, slot) in ir.slots.iter().enumerate() {
        if let Slot::ConstLiteral { value, .. } = slot {
            writeln!(code, "        let const_field_{i} = {};", render_literal(value)).unwrap();
        }
    }
    let agg_refs: Vec<String> = (1..=agg.aggregators.len())
        .map(|i| format!("&self.aggregator__{i}"))
        .collect();
    writeln!(
        code,
        "        for (key, ({})) in pansql_runtime::aggregator::combine(({})) {{",
        (0..agg.aggregators.len()).map(|i| format!("agg{i}")).collect::<Vec<_>>().join(", "),
        agg_refs.join(", ")
    )
    .unwrap();
    if let Some(having) = &agg.having {
        writeln!(code, "            if !({}) {{", render_having(having)).unwrap();
        writeln!(code, "                continue;").unwrap();
        writeln!(code, "            }}").unwrap();
    }
    writeln!(code, "            rows.push(pansql_runtime::Row::from(vec![").unwrap();
    for (i, slot) in ir.slots.iter().enumerate() {
        writeln!(code, "                {},", render_agg_slot_value(slot, i, agg)).unwrap();
    }
    writeln!(code, "            ]));").unwrap();
    writeln!(code, "        }}").unwrap();
    writeln!(code, "        rows").unwrap();
    writeln!(code, "    }}").unwrap();
}

fn render_slot_value(slot: &Slot, index_in_row: usize, row: &str, joined: &str) -> String {
    match slot {
        Slot::ReaderColumn { field_type, index, .. } => {
            format!("{row}.get_{}({index})", tag_accessor(field_type.tag))
        }
        Slot::JoinColumn { field_type, index, .. } => {
            format!("{joined}.get_{}({index})", tag_accessor(field_type.tag))
        }
        // Hoisted into a struct field by `emit_constructor` — read it back
        // rather than re-building the literal on every row.
        Slot::ConstLiteral { .. } => format!("self.const_field_{index_in_row}.clone()"),
        Slot::AggregatorOutput { .. } => {
            unreachable!("aggregator output slots are rendered via render_agg_slot_value")
        }
    }
}

/// Same as [`render_slot_value`] but for a finalized `(key, agg-tuple)`
/// pair: `ReaderColumn` slots read the group key (they are the `GROUP BY`
/// columns carried through to the projection), `AggregatorOutput` slots
/// read their numbered position in the combine tuple.
fn render_agg_slot_value(slot: &Slot, index_in_row: usize, agg: &crate::ir::AggregationPlan) -> String {
    match slot {
        Slot::ReaderColumn { field_type, index, .. } => {
            let pos = agg
                .group_by
                .iter()
                .position(|gi| gi == index)
                .expect("projected group-by column must appear in GROUP BY");
            let _ = field_type;
            format!("key.{pos}")
        }
        // Hoisted above the group loop by `emit_aggregating_advance` — read
        // the loop-invariant local rather than re-building the literal.
        Slot::ConstLiteral { .. } => format!("const_field_{index_in_row}.clone()"),
        Slot::AggregatorOutput { aggregator_index, .. } => format!("agg{aggregator_index}"),
        Slot::JoinColumn { .. } => unreachable!("aggregates never read the joined side"),
    }
}

fn render_filter(expr: &FilterExpr, row: &str, joined: &str) -> String {
    match expr {
        FilterExpr::Column(ColumnRef::Reader(i)) => format!("{row}.get_dyn({i})"),
        FilterExpr::Column(ColumnRef::Join(i)) => format!("{joined}.get_dyn({i})"),
        FilterExpr::Literal(lit) => render_literal(lit),
        FilterExpr::Paren(e) => format!("({})", render_filter(e, row, joined)),
        FilterExpr::Not(e) => format!("!({})", render_filter(e, row, joined)),
        FilterExpr::Compare(l, op, r) => format!(
            "{} {} {}",
            render_filter(l, row, joined),
            compare_op(*op),
            render_filter(r, row, joined)
        ),
        FilterExpr::Arith(l, op, r) => format!(
            "({} {} {})",
            render_filter(l, row, joined),
            arith_op(*op),
            render_filter(r, row, joined)
        ),
        FilterExpr::Bool(l, op, r) => format!(
            "({} {} {})",
            render_filter(l, row, joined),
            bool_op(*op),
            render_filter(r, row, joined)
        ),
    }
}

/// Renders a `HAVING` predicate against the `(key, agg0, agg1, ...)`
/// bindings `finalize()`'s `combine()` loop introduces: `Column(Reader(i))`
/// is the key tuple's `i`th `GROUP BY` column, `Column(Join(i))` is the
/// `i`th aggregator's already-combined result (`spec.md` §4.4 `HAVING`).
fn render_having(expr: &FilterExpr) -> String {
    match expr {
        FilterExpr::Column(ColumnRef::Reader(i)) => format!("key.{i}"),
        FilterExpr::Column(ColumnRef::Join(i)) => format!("agg{i}"),
        FilterExpr::Literal(lit) => render_literal(lit),
        FilterExpr::Paren(e) => format!("({})", render_having(e)),
        FilterExpr::Not(e) => format!("!({})", render_having(e)),
        FilterExpr::Compare(l, op, r) => {
            format!("{} {} {}", render_having(l), compare_op(*op), render_having(r))
        }
        FilterExpr::Arith(l, op, r) => {
            format!("({} {} {})", render_having(l), arith_op(*op), render_having(r))
        }
        FilterExpr::Bool(l, op, r) => {
            format!("({} {} {})", render_having(l), bool_op(*op), render_having(r))
        }
    }
}

fn render_literal(lit: &Literal) -> String {
    match lit {
        Literal::Integer(v) => format!("pansql_runtime::Value::from({v}_i64)"),
        Literal::Decimal(v) => format!("pansql_runtime::Value::from({v}_f64)"),
        Literal::String(s) => format!("pansql_runtime::Value::from({:?})", s),
        Literal::Null => "pansql_runtime::Value::Null".to_string(),
    }
}

fn compare_op(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

fn arith_op(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
    }
}

fn bool_op(op: BoolOp) -> &'static str {
    match op {
        BoolOp::And => "&&",
        BoolOp::Or => "||",
    }
}

fn agg_kind_type(kind: AggKind) -> &'static str {
    match kind {
        AggKind::Max => "Max",
        AggKind::Min => "Min",
        AggKind::Sum => "Sum",
        AggKind::Count => "Count",
        AggKind::Avg => "Avg",
    }
}

fn tag_accessor(tag: TypeTag) -> &'static str {
    match tag {
        TypeTag::Int16 => "int16",
        TypeTag::Int32 => "int32",
        TypeTag::Int64 => "int64",
        TypeTag::Float32 => "float32",
        TypeTag::Float64 => "float64",
        TypeTag::Decimal => "decimal",
        TypeTag::Date => "date",
        TypeTag::DateTime => "date_time",
        TypeTag::Time => "time",
        TypeTag::Char => "char",
        TypeTag::VarChar => "var_char",
        TypeTag::Text => "text",
        TypeTag::Binary => "binary",
        TypeTag::VarBinary => "var_binary",
        TypeTag::Blob => "blob",
        TypeTag::Json => "json",
        TypeTag::Xml => "xml",
        TypeTag::Guid => "guid",
        TypeTag::Bool => "bool",
    }
}

fn accessor(stream: &StreamDefinition, index: usize) -> &'static str {
    stream
        .fields
        .get(index)
        .map(|f| tag_accessor(f.field_type.tag))
        .unwrap_or("dyn")
}

// --- Sync struct ------------------------------------------------------------

fn emit_sync_struct(
    code: &mut String,
    transformers: &[TransformerIr],
    transformer_names: &[String],
    plans: &[SyncPlan],
) {
    writeln!(code, "/// Registers every per-stream transformer and the explicit/").unwrap();
    writeln!(code, "/// auto-mapped stream name remaps for one `sync` edge.").unwrap();
    writeln!(code, "pub struct Sync {{").unwrap();
    writeln!(code, "    transformers: Vec<(&'static str, Box<dyn pansql_runtime::StreamTransformer>)>,").unwrap();
    writeln!(code, "    name_map: Vec<(&'static str, &'static str)>,").unwrap();
    writeln!(code, "}}").unwrap();
    writeln!(code).unwrap();

    writeln!(code, "impl Sync {{").unwrap();
    writeln!(code, "    pub fn new() -> Self {{").unwrap();
    writeln!(code, "        let table__shared: std::rc::Rc<std::cell::RefCell<std::collections::HashMap<pansql_runtime::Key, pansql_runtime::Row>>> = std::rc::Rc::new(std::cell::RefCell::new(std::collections::HashMap::new()));").unwrap();
    writeln!(code, "        let mut transformers: Vec<(&'static str, Box<dyn pansql_runtime::StreamTransformer>)> = Vec::new();").unwrap();
    for (ir, name) in transformers.iter().zip(transformer_names) {
        writeln!(
            code,
            "        transformers.push(({:?}, Box::new({name}::new(table__shared.clone()))));",
            ir.source_stream.name
        )
        .unwrap();
    }
    writeln!(code, "        let mut name_map: Vec<(&'static str, &'static str)> = Vec::new();").unwrap();
    for plan in plans {
        for m in &plan.maps {
            writeln!(
                code,
                "        name_map.push(({:?}, {:?}));",
                m.src_stream.name, m.dst_stream.name
            )
            .unwrap();
        }
    }
    writeln!(code, "        Sync {{ transformers, name_map }}").unwrap();
    writeln!(code, "    }}").unwrap();
    writeln!(code, "}}").unwrap();
    writeln!(code).unwrap();

    writeln!(code, "impl pansql_runtime::Sync for Sync {{").unwrap();
    writeln!(code, "    fn transformers(&mut self) -> &mut [(&'static str, Box<dyn pansql_runtime::StreamTransformer>)] {{").unwrap();
    writeln!(code, "        &mut self.transformers").unwrap();
    writeln!(code, "    }}").unwrap();
    writeln!(code, "    fn name_map(&self) -> &[(&'static str, &'static str)] {{").unwrap();
    writeln!(code, "        &self.name_map").unwrap();
    writeln!(code, "    }}").unwrap();
    writeln!(code, "}}").unwrap();
}

// --- main() ------------------------------------------------------------------

fn emit_main(
    code: &mut String,
    ids: &mut IdGen,
    opens: &[OpenEndpoint],
    dicts: &[(String, Rc<DataDictionary>)],
    plans: &[SyncPlan],
) {
    writeln!(code, "pub fn main() {{").unwrap();
    for (name, _) in dicts {
        writeln!(
            code,
            "    let dict_{} = pansql_runtime::dictionary::decompress(DICT_{});",
            name.to_ascii_lowercase(),
            name.to_ascii_uppercase()
        )
        .unwrap();
    }
    writeln!(code).unwrap();

    let mut endpoint_local: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    for open in opens {
        let local = ids.next("reader");
        if open.connector.eq_ignore_ascii_case("Network") {
            let filename_local = ids.next("filename");
            writeln!(code, "    let {filename_local} = {:?};", open.conn_string).unwrap();
            writeln!(
                code,
                "    let {local} = pansql_runtime::connector::{}({:?}, &{filename_local});",
                endpoint_ctor(open),
                open.connector
            )
            .unwrap();
        } else {
            writeln!(
                code,
                "    let {local} = pansql_runtime::connector::{}({:?}, {:?});",
                endpoint_ctor(open),
                open.connector,
                open.conn_string
            )
            .unwrap();
        }
        endpoint_local.insert(open.name.clone(), local);
    }
    writeln!(code).unwrap();

    for plan in plans {
        let reader_local = endpoint_local
            .get(&plan.reader)
            .cloned()
            .unwrap_or_else(|| plan.reader.clone());
        let writer_local = endpoint_local
            .get(&plan.writer)
            .cloned()
            .unwrap_or_else(|| plan.writer.clone());
        writeln!(code, "    let mut sync = Sync::new();").unwrap();
        writeln!(
            code,
            "    pansql_runtime::run({reader_local}, &mut sync, {writer_local});"
        )
        .unwrap();
    }
    writeln!(code, "}}").unwrap();
}

fn endpoint_ctor(open: &OpenEndpoint) -> &'static str {
    match open.direction {
        crate::ast::Direction::Read => "get_reader",
        crate::ast::Direction::Write => "get_writer",
    }
}

// --- Manifests ---------------------------------------------------------------

fn render_project_manifest(connectors: &[String]) -> String {
    let mut deps = toml::map::Map::new();
    deps.insert(
        "pansql-runtime".to_string(),
        toml::Value::String("*".to_string()),
    );
    for c in connectors {
        deps.insert(
            format!("pansql-connector-{}", c.to_ascii_lowercase()),
            toml::Value::String("*".to_string()),
        );
    }
    let mut package = toml::map::Map::new();
    package.insert(
        "name".to_string(),
        toml::Value::String("generated_sync".to_string()),
    );

    let mut root = toml::map::Map::new();
    root.insert("package".to_string(), toml::Value::Table(package));
    root.insert("dependencies".to_string(), toml::Value::Table(deps));

    toml::to_string_pretty(&toml::Value::Table(root)).expect("manifest is always serializable")
}

fn render_connectors_manifest(connectors: &[String]) -> String {
    let entries: Vec<serde_yaml::Value> = connectors
        .iter()
        .map(|name| {
            let info = connector_registry::lookup(name);
            let mut map = serde_yaml::Mapping::new();
            map.insert("name".into(), info.name.into());
            map.insert("assembly".into(), info.assembly.into());
            let caps: Vec<serde_yaml::Value> =
                info.capabilities.iter().map(|c| c.as_str().into()).collect();
            map.insert("capabilities".into(), serde_yaml::Value::Sequence(caps));
            serde_yaml::Value::Mapping(map)
        })
        .collect();
    serde_yaml::to_string(&serde_yaml::Value::Sequence(entries))
        .expect("manifest is always serializable")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_manifest_lists_runtime_and_connectors() {
        let manifest = render_project_manifest(&["MSSQL".to_string(), "Postgres".to_string()]);
        assert!(manifest.contains("pansql-runtime"));
        assert!(manifest.contains("pansql-connector-mssql"));
        assert!(manifest.contains("pansql-connector-postgres"));
    }

    #[test]
    fn connectors_manifest_lists_capabilities() {
        let manifest = render_connectors_manifest(&["MSSQL".to_string()]);
        assert!(manifest.contains("MSSQL"));
        assert!(manifest.contains("Queryable"));
    }

    #[test]
    fn format_byte_array_is_valid_rust_array_literal() {
        assert_eq!(format_byte_array(&[0, 255, 16]), "[0x00,0xff,0x10]");
    }

    #[test]
    fn literal_projection_slot_is_hoisted_above_the_group_loop() {
        use crate::dictionary::{FieldDefinition, FieldType, StreamDefinition, TypeTag};
        use crate::ir::{AggregationPlan, Aggregator};

        let stream = Rc::new(
            StreamDefinition::new("dbo", "Products")
                .field(FieldDefinition::new("Vendor", FieldType::new(TypeTag::Int32)))
                .field(FieldDefinition::new("Price", FieldType::new(TypeTag::Decimal))),
        );
        let ir = TransformerIr {
            into_name: "productsAggG".to_string(),
            source_var: "p".to_string(),
            source_stream: stream.clone(),
            source_is_table: false,
            join: None,
            filter: None,
            aggregation: Some(AggregationPlan {
                group_by: vec![0],
                aggregators: vec![Aggregator {
                    kind: AggKind::Max,
                    source_index: Some(1),
                }],
                having: None,
            }),
            slots: vec![
                Slot::ReaderColumn {
                    name: "Vendor".to_string(),
                    field_type: FieldType::new(TypeTag::Int32),
                    index: 0,
                },
                Slot::AggregatorOutput {
                    name: "MaxPrice".to_string(),
                    field_type: FieldType::new(TypeTag::Decimal),
                    aggregator_index: 0,
                },
                Slot::ConstLiteral {
                    name: "Quantity".to_string(),
                    field_type: FieldType::new(TypeTag::Int32),
                    value: Literal::Integer(10),
                },
            ],
            dest_stream: stream,
        };

        let mut code = String::new();
        let mut ids = IdGen::default();
        emit_transformer(&mut code, &mut ids, &ir, "Transformer__1");

        let hoist_pos = code
            .find("let const_field_2 = pansql_runtime::Value::from(10_i64);")
            .expect("constant must be hoisted above the group loop");
        let loop_pos = code
            .find("for (key,")
            .expect("group loop must be emitted");
        assert!(
            hoist_pos < loop_pos,
            "constant hoist must precede the group loop, got hoist@{hoist_pos} loop@{loop_pos}"
        );
        assert!(code.contains("const_field_2.clone()"));
        // The literal is assigned exactly once — not re-built per iteration.
        assert_eq!(
            code.matches("pansql_runtime::Value::from(10_i64)").count(),
            1
        );
    }
}

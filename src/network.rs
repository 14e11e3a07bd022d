// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-script network pass (`spec.md` §4.6).
//!
//! Runs once every script in a `compile_files` bundle has been analyzed,
//! after semantic analysis but before emission. Pairs a `Network`-connector
//! writer in script *i* with a `Network`-connector reader in script
//! *j > i*, allocates a temp file, writes the writer's destination
//! dictionary to it, and rewrites both connection strings to embed the
//! shared path — positionally, not by any declared endpoint name (the
//! grammar carries no topology beyond connector kind and direction).

use std::io::Write as _;
use std::rc::Rc;

use crate::ast::Direction;
use crate::dictionary::DataDictionary;
use crate::error::NetworkError;
use crate::semantic::AnalyzedProgram;

/// One script's worth of analysis, as held by [`crate::compile_files`]
/// between semantic analysis and emission.
pub struct NetworkUnit<'a> {
    pub script_name: &'a str,
    pub analyzed: &'a mut AnalyzedProgram,
}

/// Rewrites `Network` connection strings in place across the whole script
/// set. Returns an error naming the first unmatched endpoint, per
/// `spec.md` §4.6 ("if unmatched, fatal").
pub fn apply(units: &mut [NetworkUnit<'_>]) -> Result<(), NetworkError> {
    let mut writers = Vec::new();
    let mut readers = Vec::new();
    for (script_idx, unit) in units.iter().enumerate() {
        for (open_idx, open) in unit.analyzed.opens.iter().enumerate() {
            if !open.connector.eq_ignore_ascii_case("Network") {
                continue;
            }
            match open.direction {
                Direction::Write => writers.push((script_idx, open_idx)),
                Direction::Read => readers.push((script_idx, open_idx)),
            }
        }
    }

    let mut used_readers = vec![false; readers.len()];

    for &(wsi, woi) in &writers {
        let reader_pos = readers
            .iter()
            .enumerate()
            .find(|(i, &(rsi, _))| !used_readers[*i] && rsi > wsi)
            .map(|(i, &pair)| (i, pair));

        let Some((reader_slot, (rsi, roi))) = reader_pos else {
            let name = units[wsi].analyzed.opens[woi].name.clone();
            return Err(NetworkError::UnmatchedWriter(
                name,
                units[wsi].script_name.to_string(),
            ));
        };
        used_readers[reader_slot] = true;

        let dict = writer_dict(&units[wsi]);
        let path = write_temp_dictionary(&dict);
        let path_str = path.to_string_lossy().into_owned();

        let writer_open = &mut units[wsi].analyzed.opens[woi];
        writer_open.conn_string = format!("{};{}", writer_open.conn_string, path_str);

        let reader_open = &mut units[rsi].analyzed.opens[roi];
        reader_open.conn_string = format!("{};{}", reader_open.conn_string, path_str);
    }

    for (i, &(rsi, roi)) in readers.iter().enumerate() {
        if !used_readers[i] {
            let name = units[rsi].analyzed.opens[roi].name.clone();
            return Err(NetworkError::UnmatchedReader(
                name,
                units[rsi].script_name.to_string(),
            ));
        }
    }

    Ok(())
}

fn writer_dict(unit: &NetworkUnit<'_>) -> Rc<DataDictionary> {
    unit.analyzed
        .dicts
        .iter()
        .find_map(|(name, dict)| {
            if unit
                .analyzed
                .opens
                .iter()
                .any(|o| o.dict_name.eq_ignore_ascii_case(name))
            {
                Some(dict.clone())
            } else {
                None
            }
        })
        .unwrap_or_else(|| Rc::new(DataDictionary::default()))
}

fn write_temp_dictionary(dict: &DataDictionary) -> std::path::PathBuf {
    let mut file = tempfile::Builder::new()
        .prefix("pansql-dict-")
        .suffix(".json")
        .tempfile()
        .expect("temp file allocation for network handoff cannot fail under normal operation");
    let json = serde_json::to_vec(&dict.streams).expect("dictionary is always serializable");
    file.write_all(&json)
        .expect("writing the handoff dictionary cannot fail under normal operation");
    let (_, path) = file.keep().expect("temp file must outlive this function");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Direction;
    use crate::dictionary::StreamDefinition;
    use crate::semantic::OpenEndpoint;
    use crate::symbol::SymbolTable;

    fn unit(name: &'static str, opens: Vec<OpenEndpoint>) -> AnalyzedProgram {
        AnalyzedProgram {
            dicts: vec![("Dst".to_string(), Rc::new(DataDictionary::new(vec![
                StreamDefinition::new("dbo", "Users"),
            ])))],
            symbols: SymbolTable::new(),
            selects: Vec::new(),
            raw_maps: Vec::new(),
            opens,
            syncs: Vec::new(),
        }
    }

    #[test]
    fn pairs_writer_with_later_reader_and_rewrites_conn_strings() {
        let mut first = unit(
            "first",
            vec![OpenEndpoint {
                name: "W".to_string(),
                connector: "Network".to_string(),
                direction: Direction::Write,
                dict_name: "Dst".to_string(),
                conn_string: "127.0.0.1".to_string(),
            }],
        );
        let mut second = unit(
            "second",
            vec![OpenEndpoint {
                name: "R".to_string(),
                connector: "Network".to_string(),
                direction: Direction::Read,
                dict_name: "Dst".to_string(),
                conn_string: "127.0.0.1".to_string(),
            }],
        );
        let mut units = vec![
            NetworkUnit {
                script_name: "first",
                analyzed: &mut first,
            },
            NetworkUnit {
                script_name: "second",
                analyzed: &mut second,
            },
        ];
        apply(&mut units).unwrap();
        assert!(first.opens[0].conn_string.contains(';'));
        assert!(second.opens[0].conn_string.contains(';'));
        let writer_path = first.opens[0].conn_string.split(';').nth(1).unwrap();
        let reader_path = second.opens[0].conn_string.split(';').nth(1).unwrap();
        assert_eq!(writer_path, reader_path);
    }

    #[test]
    fn unmatched_writer_is_fatal() {
        let mut first = unit(
            "only",
            vec![OpenEndpoint {
                name: "W".to_string(),
                connector: "Network".to_string(),
                direction: Direction::Write,
                dict_name: "Dst".to_string(),
                conn_string: "127.0.0.1".to_string(),
            }],
        );
        let mut units = vec![NetworkUnit {
            script_name: "only",
            analyzed: &mut first,
        }];
        assert!(apply(&mut units).is_err());
    }
}

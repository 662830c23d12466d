use anyhow::{bail, Context};
use packsleuth_core::{parse_card_amount, Catalog, CatalogPack};
use std::fs;
use std::path::Path;

pub fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_catalog(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Parses the pack list format:
///
/// - `##`-prefixed lines declare a pack; the remainder, minus leading hashes,
///   numbering and spaces, is the exact pack name, and the name minus trailing
///   digits is its family.
/// - `-` or `*` lines declare a card of the most recent pack, either bare or
///   as `<N>x <name>`; repeated names accumulate.
/// - Blank lines are skipped; anything else is a load error.
pub fn parse_catalog(source: &str) -> anyhow::Result<Catalog> {
    let mut packs: Vec<CatalogPack> = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        if line.starts_with("##") {
            let name = heading_name(line);
            if name.is_empty() {
                bail!("line {}: pack heading with no name", idx + 1);
            }
            let family = name.trim_end_matches(|c: char| c.is_ascii_digit() || c == ' ');
            packs.push(CatalogPack::new(name, family));
        } else if line.starts_with('-') || line.starts_with('*') {
            let Some(pack) = packs.last_mut() else {
                bail!("line {}: card listed before any pack heading: {line}", idx + 1);
            };
            let body = line.trim_start_matches(['-', '*', ' ']);
            let (card, count) = parse_card_amount(body);
            if card.is_empty() {
                bail!("line {}: card entry with no name", idx + 1);
            }
            pack.add_card(card, count);
        } else if line.trim().is_empty() {
            continue;
        } else {
            bail!("line {}: unrecognized catalog line: {line}", idx + 1);
        }
    }
    Ok(Catalog { packs })
}

fn heading_name(line: &str) -> &str {
    line.trim_start_matches(|c: char| c == '#' || c == '.' || c == ' ' || c.is_ascii_digit())
        .trim_end()
}

//! Human-readable wave dump for the debug command.

use crate::wave::Wave;

const RULE_C: &str = " C -----------------------------------------------";
const RULE_W: &str = " W -----------------------------------------------";
const RULE_L: &str = " L -----------------------------------------------";

/// Render a wave as the debug command's reply lines: the configuration and
/// counter blocks, then (with `show_lists`) every non-empty level queue and
/// the chronological list. Read-only.
#[must_use]
pub fn render(wave: &Wave, show_lists: bool, now: i64) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(RULE_C.to_owned());
    lines.push(format!("     NOW => {now}"));
    lines.push(RULE_C.to_owned());
    lines.push(format!("  EXPIRE => {}", i32::from(wave.auto_expire())));
    lines.push(format!("       N => {}", wave.window()));
    lines.push(format!("       E => {:.6}", wave.epsilon()));
    lines.push(format!("       R => {}", wave.bound()));
    lines.push(format!("       M => {}", wave.modulus()));
    lines.push(RULE_C.to_owned());
    lines.push(format!("start ts => {}", wave.start()));
    lines.push(format!(" last ts => {}", wave.last()));
    lines.push(format!("limit ts => {}", wave.last() + wave.window()));
    lines.push(format!("     pos => {}", wave.pos()));
    lines.push(format!("   total => {}", wave.total_raw()));
    lines.push(format!("       z => {}", wave.z()));
    lines.push(RULE_C.to_owned());

    if show_lists {
        lines.push(" ".to_owned());
        lines.push(RULE_W.to_owned());
        lines.push(format!("    #l => {}", wave.num_levels()));
        lines.push(format!("max sz => {}", wave.level_cap()));

        for level in 0..wave.num_levels() {
            if wave.level_triples(level).next().is_none() {
                continue;
            }
            lines.push(format!(
                " l [{level}] --------------------------------------------"
            ));
            for (k, item) in wave.level_triples(level).enumerate() {
                lines.push(format!(
                    "      [{k:2}] => ( p={} , v={} , z={} )",
                    item.pos, item.v, item.z
                ));
            }
            lines.push(" l -----------------------------------------------".to_owned());
        }
        lines.push(" ".to_owned());

        lines.push(RULE_W.to_owned());
        lines.push(RULE_L.to_owned());
        lines.push(format!("  sz L => {}", wave.len()));
        for item in wave.triples() {
            lines.push(format!(
                "  ( p={} , v={} , z={} )",
                item.pos, item.v, item.z
            ));
        }
        lines.push(RULE_L.to_owned());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use swave_types::WaveConfig;

    #[test]
    fn config_block_only_by_default() {
        let wave = Wave::new(WaveConfig::new(60, 0.05, 1024, true), 1000).unwrap();
        let lines = render(&wave, false, 1234);
        assert_eq!(lines.len(), 16);
        assert!(lines.contains(&"     NOW => 1234".to_owned()));
        assert!(lines.contains(&"       N => 60".to_owned()));
        assert!(lines.contains(&"       E => 0.050000".to_owned()));
        assert!(lines.contains(&"       M => 131072".to_owned()));
        assert!(!lines.iter().any(|l| l.contains("sz L")));
    }

    #[test]
    fn list_block_shows_queues_and_chronology() {
        let mut wave = Wave::new(WaveConfig::new(3, 0.5, 10, true), 100).unwrap();
        wave.incr(1, 100).unwrap();
        wave.incr(2, 101).unwrap();

        let lines = render(&wave, true, 101);
        assert!(lines.contains(&"  sz L => 2".to_owned()));
        assert!(lines.contains(&"  ( p=0 , v=1 , z=1 )".to_owned()));
        assert!(lines.contains(&"  ( p=1 , v=2 , z=3 )".to_owned()));
        // Each item also appears in its level queue block.
        assert!(
            lines
                .iter()
                .any(|l| l.contains("[ 0] => ( p=0 , v=1 , z=1 )"))
        );
    }
}

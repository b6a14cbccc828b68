//! Winner computation over decrypted tallies

use crate::types::Winner;

/// Plurality winner of a battle.
///
/// `tallies[t]` is the vote count of template `t` and `caption_picks[t]` the
/// caption sampled from that template's voters. Ties go to the lowest
/// template id. Returns `None` when no template received a vote.
pub fn compute_winner(tallies: &[u64], caption_picks: &[u64], caption_count: u16) -> Option<Winner> {
    let mut best: Option<(usize, u64)> = None;
    for (template, &votes) in tallies.iter().enumerate() {
        // strict `>` keeps the earliest template on ties
        if votes > best.map_or(0, |(_, v)| v) {
            best = Some((template, votes));
        }
    }

    let (template, votes) = best?;
    let pick = caption_picks.get(template).copied().unwrap_or(0);
    let caption = if caption_count == 0 { 0 } else { pick % u64::from(caption_count) };

    Some(Winner {
        template_id: u8::try_from(template).unwrap_or(u8::MAX),
        caption_id: u16::try_from(caption).unwrap_or(0),
        votes: u32::try_from(votes).unwrap_or(u32::MAX),
    })
}

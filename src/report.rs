//! Reports: standings, round summaries, player and tournament listings, CSV export.

use crate::models::{Player, PlayerId, Points, RoundStatus, Tournament};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Write;

/// One line of the standings table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Standing {
    pub rank: usize,
    pub player: PlayerId,
    pub name: String,
    pub score: f64,
}

/// One game as shown in a round summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchLine {
    pub first: String,
    pub second: String,
    pub result: Option<[Points; 2]>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundSummary {
    pub name: String,
    pub status: RoundStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub matches: Vec<MatchLine>,
}

/// When a tournament takes place relative to a given day.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Timing {
    Past,
    Ongoing,
    Future,
}

impl Timing {
    pub fn of(tournament: &Tournament, today: NaiveDate) -> Self {
        if tournament.end_date < today {
            Timing::Past
        } else if tournament.begin_date > today {
            Timing::Future
        } else {
            Timing::Ongoing
        }
    }
}

/// Display name of a player id; falls back to the id when unregistered.
pub fn player_name(players: &[Player], id: PlayerId) -> String {
    players
        .iter()
        .find(|p| p.id == id)
        .map(|p| format!("{} {}", p.first_name, p.last_name))
        .unwrap_or_else(|| id.to_string())
}

/// Participants by score (highest first), ties by name. Tied players share a rank.
pub fn standings(tournament: &Tournament, players: &[Player]) -> Vec<Standing> {
    let mut lines: Vec<Standing> = tournament
        .participants()
        .iter()
        .map(|p| Standing {
            rank: 0,
            player: p.player,
            name: player_name(players, p.player),
            score: p.score,
        })
        .collect();
    lines.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    for i in 0..lines.len() {
        lines[i].rank = if i > 0 && lines[i - 1].score == lines[i].score {
            lines[i - 1].rank
        } else {
            i + 1
        };
    }
    lines
}

/// Every round with its games, in play order.
pub fn round_summaries(tournament: &Tournament, players: &[Player]) -> Vec<RoundSummary> {
    let participants = tournament.participants();
    tournament
        .rounds()
        .iter()
        .map(|round| RoundSummary {
            name: round.name.clone(),
            status: round.status,
            start_time: round.start_time,
            end_time: round.end_time,
            matches: round
                .matches
                .iter()
                .map(|m| {
                    let [a, b] = m.participants_pair;
                    MatchLine {
                        first: player_name(players, participants[a].player),
                        second: player_name(players, participants[b].player),
                        result: m.participants_scores,
                    }
                })
                .collect(),
        })
        .collect()
}

/// Players sorted by last name, then first name.
pub fn players_alphabetical(players: &[Player]) -> Vec<&Player> {
    let mut sorted: Vec<&Player> = players.iter().collect();
    sorted.sort_by_key(|p| p.sort_key());
    sorted
}

/// Tournaments (with their store index) whose name contains `query`, case-insensitive.
pub fn find_by_name<'a>(tournaments: &'a [Tournament], query: &str) -> Vec<(usize, &'a Tournament)> {
    let query = query.trim().to_lowercase();
    let mut found: Vec<_> = tournaments
        .iter()
        .enumerate()
        .filter(|(_, t)| t.name.to_lowercase().contains(&query))
        .collect();
    found.sort_by_key(|(_, t)| t.begin_date);
    found
}

/// Tournaments (with their store index) of the given timing, by begin date.
pub fn by_timing(
    tournaments: &[Tournament],
    timing: Timing,
    today: NaiveDate,
) -> Vec<(usize, &Tournament)> {
    let mut found: Vec<_> = tournaments
        .iter()
        .enumerate()
        .filter(|(_, t)| Timing::of(t, today) == timing)
        .collect();
    found.sort_by_key(|(_, t)| t.begin_date);
    found
}

/// Write the standings as CSV (`rank,name,national_id,score`).
pub fn write_standings_csv<W: Write>(
    tournament: &Tournament,
    players: &[Player],
    writer: W,
) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["rank", "name", "national_id", "score"])?;
    for line in standings(tournament, players) {
        let national_id = players
            .iter()
            .find(|p| p.id == line.player)
            .map(|p| p.national_id.as_str())
            .unwrap_or("");
        out.write_record([
            line.rank.to_string(),
            line.name,
            national_id.to_string(),
            line.score.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Vec<Player> {
        let born = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        vec![
            Player::new("CC300", "Carla", "Zeller", born),
            Player::new("AA100", "Anna", "Berg", born),
            Player::new("BB200", "Boris", "Adler", born),
        ]
    }

    fn tournament(players: &[Player], begin: (i32, u32, u32), end: (i32, u32, u32)) -> Tournament {
        let begin = NaiveDate::from_ymd_opt(begin.0, begin.1, begin.2).unwrap();
        let end = NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap();
        let mut t = Tournament::new("Cup", "Metz", begin, end, 4);
        for p in players {
            t.add_participant(p.id).unwrap();
        }
        t
    }

    #[test]
    fn standings_share_rank_on_ties() {
        let players = players();
        let mut t = tournament(&players, (2024, 1, 1), (2024, 1, 2));
        t.participants[0].score = 1.0;
        t.participants[1].score = 2.0;
        t.participants[2].score = 1.0;
        let lines = standings(&t, &players);
        let ranks: Vec<(usize, &str)> = lines.iter().map(|l| (l.rank, l.name.as_str())).collect();
        assert_eq!(ranks, vec![(1, "Anna Berg"), (2, "Boris Adler"), (2, "Carla Zeller")]);
    }

    #[test]
    fn players_sorted_by_last_name() {
        let players = players();
        let names: Vec<&str> = players_alphabetical(&players)
            .into_iter()
            .map(|p| p.last_name.as_str())
            .collect();
        assert_eq!(names, vec!["Adler", "Berg", "Zeller"]);
    }

    #[test]
    fn timing_relative_to_today() {
        let players = players();
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let list = vec![
            tournament(&players, (2024, 7, 1), (2024, 7, 2)),
            tournament(&players, (2024, 6, 9), (2024, 6, 10)),
            tournament(&players, (2024, 1, 1), (2024, 1, 2)),
        ];
        assert_eq!(by_timing(&list, Timing::Future, today)[0].0, 0);
        assert_eq!(by_timing(&list, Timing::Ongoing, today)[0].0, 1);
        assert_eq!(by_timing(&list, Timing::Past, today)[0].0, 2);
        assert_eq!(find_by_name(&list, " cup ").len(), 3);
        assert!(find_by_name(&list, "open").is_empty());
    }

    #[test]
    fn csv_export_lists_standings() {
        let players = players();
        let mut t = tournament(&players, (2024, 1, 1), (2024, 1, 2));
        t.participants[1].score = 1.5;
        let mut buf = Vec::new();
        write_standings_csv(&t, &players, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("rank,name,national_id,score"));
        assert_eq!(lines.next(), Some("1,Anna Berg,AA100,1.5"));
        assert_eq!(text.lines().count(), 4);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Database — SQLite storage for match results and ELO ratings
// ═══════════════════════════════════════════════════════════════════════

use crate::runner::GameResult;
use conquest_engine::types::PlayerId;
use rusqlite::{params, Connection, OptionalExtension};

pub const DEFAULT_ELO: f64 = 1500.0;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS agents (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        elo         REAL NOT NULL DEFAULT 1500.0,
        games       INTEGER NOT NULL DEFAULT 0,
        wins        INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS games (
        id          INTEGER PRIMARY KEY,
        seed        INTEGER NOT NULL,
        rounds      INTEGER NOT NULL,
        decisions   INTEGER NOT NULL,
        winner      INTEGER,
        played_at   TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS game_players (
        id          INTEGER PRIMARY KEY,
        game_id     INTEGER NOT NULL REFERENCES games(id),
        agent_id    INTEGER NOT NULL REFERENCES agents(id),
        seat        INTEGER NOT NULL,
        label       TEXT NOT NULL,
        objective   TEXT NOT NULL,
        territories INTEGER NOT NULL,
        armies      INTEGER NOT NULL,
        eliminated  INTEGER NOT NULL
    );
";

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub name: String,
    pub elo: f64,
    pub games: u32,
    pub wins: u32,
    /// Mean territories held at the end of a match, across every seat played.
    pub avg_territories: f64,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn new(path: &str) -> Self {
        Self::with_schema(Connection::open(path).expect("Failed to open database"))
    }

    /// In-memory database (useful for tests).
    pub fn in_memory() -> Self {
        Self::with_schema(Connection::open_in_memory().expect("Failed to open in-memory database"))
    }

    fn with_schema(conn: Connection) -> Self {
        conn.execute_batch(SCHEMA).expect("Failed to create schema");
        Database { conn }
    }

    /// Id for an agent name, inserting it at the default rating if new.
    pub fn register_agent(&self, name: &str) -> i64 {
        self.conn
            .execute("INSERT OR IGNORE INTO agents (name) VALUES (?1)", params![name])
            .expect("Failed to register agent");
        self.conn
            .query_row("SELECT id FROM agents WHERE name = ?1", params![name], |row| row.get(0))
            .expect("Failed to get agent id")
    }

    /// Store a match. `seats` pairs each seat with the agent that played it.
    /// Each distinct agent is credited one game, plus a win if it held the
    /// winning seat.
    pub fn store_game(&self, result: &GameResult, seats: &[(PlayerId, i64)]) -> i64 {
        let tx = self.conn.unchecked_transaction().expect("Failed to begin transaction");
        tx.execute(
            "INSERT INTO games (seed, rounds, decisions, winner) VALUES (?1, ?2, ?3, ?4)",
            params![
                result.seed as i64,
                result.rounds_played,
                result.decisions as i64,
                result.winner.map(|w| w.0),
            ],
        ).expect("Failed to store game");
        let game_id = tx.last_insert_rowid();

        let agent_at = |seat: PlayerId| {
            seats.iter().find(|(s, _)| *s == seat).map_or(0, |(_, id)| *id)
        };

        for pr in &result.player_results {
            tx.execute(
                "INSERT INTO game_players (game_id, agent_id, seat, label, objective, territories, armies, eliminated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    game_id,
                    agent_at(pr.player),
                    pr.player.0,
                    pr.label,
                    pr.objective,
                    pr.final_territories as i64,
                    pr.final_armies,
                    pr.eliminated,
                ],
            ).expect("Failed to store seat");
        }

        let winner = result.winner.map(agent_at);
        for agent in distinct_agents(seats) {
            tx.execute(
                "UPDATE agents SET games = games + 1, wins = wins + ?1 WHERE id = ?2",
                params![winner == Some(agent), agent],
            ).expect("Failed to update agent stats");
        }

        tx.commit().expect("Failed to commit game");
        game_id
    }

    /// Rate a won match: the winner plays a pairwise ELO game against each
    /// losing agent. All deltas use the ratings from before the match.
    pub fn update_elo(&self, winner: i64, losers: &[i64], k: f64) {
        let winner_elo = self.elo(winner).unwrap_or(DEFAULT_ELO);
        let deltas: Vec<(i64, f64)> = losers.iter()
            .filter(|&&loser| loser != winner)
            .map(|&loser| {
                let loser_elo = self.elo(loser).unwrap_or(DEFAULT_ELO);
                let expected = 1.0 / (1.0 + 10f64.powf((loser_elo - winner_elo) / 400.0));
                (loser, k * (1.0 - expected))
            })
            .collect();

        let tx = self.conn.unchecked_transaction().expect("Failed to begin transaction");
        for (loser, delta) in deltas {
            tx.execute("UPDATE agents SET elo = elo + ?1 WHERE id = ?2", params![delta, winner])
                .expect("Failed to update winner ELO");
            tx.execute("UPDATE agents SET elo = elo - ?1 WHERE id = ?2", params![delta, loser])
                .expect("Failed to update loser ELO");
        }
        tx.commit().expect("Failed to commit ELO update");
    }

    pub fn elo(&self, agent: i64) -> Option<f64> {
        self.conn
            .query_row("SELECT elo FROM agents WHERE id = ?1", params![agent], |row| row.get(0))
            .optional()
            .ok()
            .flatten()
    }

    /// Agents by rating, best first.
    pub fn leaderboard(&self) -> Vec<Standing> {
        let mut stmt = self.conn.prepare("
            SELECT a.name, a.elo, a.games, a.wins, COALESCE(AVG(gp.territories), 0.0)
            FROM agents a
            LEFT JOIN game_players gp ON gp.agent_id = a.id
            GROUP BY a.id
            ORDER BY a.elo DESC, a.name
        ").expect("Failed to prepare leaderboard query");

        stmt.query_map([], |row| {
            Ok(Standing {
                name: row.get(0)?,
                elo: row.get(1)?,
                games: row.get(2)?,
                wins: row.get(3)?,
                avg_territories: row.get(4)?,
            })
        })
        .expect("Failed to query leaderboard")
        .filter_map(|r| r.ok())
        .collect()
    }

    pub fn game_count(&self) -> u32 {
        self.count("SELECT COUNT(*) FROM games")
    }

    /// Matches that ended at the round limit.
    pub fn draw_count(&self) -> u32 {
        self.count("SELECT COUNT(*) FROM games WHERE winner IS NULL")
    }

    fn count(&self, sql: &str) -> u32 {
        self.conn.query_row(sql, [], |row| row.get(0)).unwrap_or(0)
    }
}

fn distinct_agents(seats: &[(PlayerId, i64)]) -> Vec<i64> {
    let mut ids: Vec<i64> = seats.iter().map(|(_, id)| *id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

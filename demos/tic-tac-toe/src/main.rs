use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use turnsync::prelude::*;

// ---------------------------------------------------------------------------
// Game types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Cell { Empty, X, O }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; 3]; 3],
    turn: usize, // seat to move: 0 = X, 1 = O
    winner: Option<String>,
    draw: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Move { pub row: usize, pub col: usize }

const MAKE_MOVE: &str = "MAKE_MOVE";

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

struct TicTacToe;

impl TicTacToe {
    fn board(state: &Value) -> Result<Board, String> {
        serde_json::from_value(state.clone()).map_err(|e| format!("bad board: {e}"))
    }

    fn parse_move(action: &Action) -> Result<Move, String> {
        serde_json::from_value(action.payload.clone()).map_err(|e| format!("bad move: {e}"))
    }
}

impl Game for TicTacToe {
    fn setup(_num_players: usize) -> Value {
        json!(Board {
            cells: [[Cell::Empty; 3]; 3],
            turn: 0,
            winner: None,
            draw: false,
        })
    }

    fn validate(state: &Value, player: Option<&PlayerId>, action: &Action) -> Result<(), String> {
        if action.kind != MAKE_MOVE {
            return Err(format!("unknown action {}", action.kind));
        }
        let board = Self::board(state)?;
        let mv = Self::parse_move(action)?;
        if board.winner.is_some() || board.draw {
            return Err("game is over".into());
        }
        if player.map(PlayerId::as_str) != Some(board.turn.to_string().as_str()) {
            return Err("not your turn".into());
        }
        if mv.row >= 3 || mv.col >= 3 {
            return Err("row and col must be 0-2".into());
        }
        if board.cells[mv.row][mv.col] != Cell::Empty {
            return Err("cell is occupied".into());
        }
        Ok(())
    }

    fn apply(state: &mut Value, player: Option<&PlayerId>, action: &Action) {
        let (Ok(mut board), Ok(mv)) = (Self::board(state), Self::parse_move(action)) else {
            return;
        };
        let mark = if board.turn == 0 { Cell::X } else { Cell::O };
        board.cells[mv.row][mv.col] = mark;

        if check_winner(&board.cells, mark) {
            board.winner = player.map(|p| p.as_str().to_owned());
        } else if board_full(&board.cells) {
            board.draw = true;
        } else {
            board.turn = 1 - board.turn;
        }

        if let Ok(next) = serde_json::to_value(&board) {
            *state = next;
        }
    }
}

fn check_winner(b: &[[Cell; 3]; 3], m: Cell) -> bool {
    (0..3).any(|i| (0..3).all(|j| b[i][j] == m))           // rows
    || (0..3).any(|j| (0..3).all(|i| b[i][j] == m))        // cols
    || (0..3).all(|i| b[i][i] == m)                         // diagonal
    || (0..3).all(|i| b[i][2 - i] == m)                     // anti-diagonal
}

fn board_full(b: &[[Cell; 3]; 3]) -> bool {
    b.iter().all(|row| row.iter().all(|c| *c != Cell::Empty))
}

// ---------------------------------------------------------------------------
// Hot-seat table: two seats sharing one in-process master
// ---------------------------------------------------------------------------

type Seat = Transport<Rc<LocalMaster<TicTacToe>>>;

struct Table {
    seats: Vec<(Seat, Rc<std::cell::RefCell<Store>>)>,
}

impl Table {
    fn open(master: &Rc<LocalMaster<TicTacToe>>, instance: &str) -> Result<Self, TurnsyncError> {
        let mut seats = Vec::new();
        for seat in 0..2 {
            let store = Store::default().shared();
            let mut transport = Transport::new(Rc::clone(master), ClientConfig::new("ttt"))?
                .with_replica(store.clone());
            transport.update_game_id(Some(instance.to_owned()));
            transport.update_player_id(Some(PlayerId::from(seat.to_string().as_str())));
            transport.connect();
            seats.push((transport, store));
        }
        let mut table = Self { seats };
        table.settle();
        Ok(table)
    }

    fn settle(&mut self) {
        for (transport, _) in &mut self.seats {
            transport.poll();
        }
    }

    fn play(&mut self, seat: usize, row: usize, col: usize) {
        let (transport, store) = &self.seats[seat];
        let local = store.borrow().state().clone();
        transport.on_action(&local, &Action::new(MAKE_MOVE, json!(Move { row, col })));
        self.settle();
    }

    fn board(&self, seat: usize) -> Option<Board> {
        let (_, store) = &self.seats[seat];
        serde_json::from_value(store.borrow().state().payload.clone()).ok()
    }

    fn version(&self, seat: usize) -> u64 {
        self.seats[seat].1.borrow().state().version
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), TurnsyncError> {
    init_tracing();

    if std::env::args().nth(1).as_deref() == Some("serve") {
        let addr = std::env::var("TURNSYNC_BIND").unwrap_or_else(|_| "0.0.0.0:8000".into());
        tracing::info!(%addr, "starting tic-tac-toe master");
        let server = MasterServer::<TicTacToe>::builder().bind(&addr).build().await?;
        return Ok(server.run().await?);
    }

    let master = Rc::new(LocalMaster::<TicTacToe>::new());
    let mut table = Table::open(&master, "hot-seat")?;
    for (seat, row, col) in [(0, 0, 0), (1, 1, 0), (0, 0, 1), (1, 1, 1), (0, 0, 2)] {
        table.play(seat, row, col);
        tracing::info!(seat, row, col, version = table.version(seat), "move played");
    }
    if let Some(board) = table.board(1) {
        tracing::info!(winner = ?board.winner, draw = board.draw, "game finished");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> (Rc<LocalMaster<TicTacToe>>, Table) {
        let master = Rc::new(LocalMaster::new());
        let table = Table::open(&master, "test").unwrap();
        (master, table)
    }

    fn seat(n: &str) -> PlayerId {
        PlayerId::from(n)
    }

    fn mv(row: usize, col: usize) -> Action {
        Action::new(MAKE_MOVE, json!(Move { row, col }))
    }

    #[test]
    fn test_both_seats_start_from_empty_board() {
        let (_master, table) = table();
        assert_eq!(table.version(0), 0);
        assert_eq!(table.board(0), table.board(1));
        assert_eq!(table.board(0).unwrap().cells, [[Cell::Empty; 3]; 3]);
    }

    #[test]
    fn test_single_move_reaches_both_seats() {
        let (_master, mut table) = table();
        table.play(0, 0, 0);

        assert_eq!(table.version(0), 1);
        assert_eq!(table.version(1), 1);
        assert_eq!(table.board(1).unwrap().cells[0][0], Cell::X);
        assert_eq!(table.board(1).unwrap().turn, 1);
    }

    // ---------------------------------------------------------------
    // Full game: X wins with top row
    //  X | X | X
    //  O | O | .
    //  . | . | .
    // ---------------------------------------------------------------
    #[test]
    fn test_x_wins_top_row() {
        let (master, mut table) = table();
        for (s, row, col) in [(0, 0, 0), (1, 1, 0), (0, 0, 1), (1, 1, 1), (0, 0, 2)] {
            table.play(s, row, col);
        }

        let board = table.board(1).unwrap();
        assert_eq!(board.winner.as_deref(), Some("0"));
        assert_eq!(table.version(0), 5);
        let key = GameId::compose("ttt", Some("test")).unwrap();
        assert_eq!(master.game(&key).unwrap().version, 5);
    }

    // ---------------------------------------------------------------
    // Draw game
    //  X | O | X
    //  X | O | X
    //  O | X | O
    // ---------------------------------------------------------------
    #[test]
    fn test_draw() {
        let (_master, mut table) = table();
        let moves = [
            (0, 0, 0), (1, 0, 1), (0, 0, 2), (1, 1, 1), (0, 1, 0),
            (1, 2, 0), (0, 1, 2), (1, 2, 2), (0, 2, 1),
        ];
        for (s, row, col) in moves {
            table.play(s, row, col);
        }

        let board = table.board(0).unwrap();
        assert!(board.draw);
        assert_eq!(board.winner, None);
    }

    // ---------------------------------------------------------------
    // Wrong turn: O tries to go first and is ignored
    // ---------------------------------------------------------------
    #[test]
    fn test_wrong_turn_ignored() {
        let (_master, mut table) = table();
        table.play(1, 0, 0);
        assert_eq!(table.version(0), 0);

        table.play(0, 0, 0);
        assert_eq!(table.version(1), 1);
        assert_eq!(table.board(1).unwrap().cells[0][0], Cell::X);
    }

    #[test]
    fn test_validate_rejects_out_of_bounds() {
        let state = TicTacToe::setup(2);
        let r = TicTacToe::validate(&state, Some(&seat("0")), &mv(3, 0));
        assert!(r.unwrap_err().contains("0-2"));
    }

    #[test]
    fn test_validate_rejects_occupied_cell() {
        let mut state = TicTacToe::setup(2);
        TicTacToe::apply(&mut state, Some(&seat("0")), &mv(0, 0));
        let r = TicTacToe::validate(&state, Some(&seat("1")), &mv(0, 0));
        assert!(r.unwrap_err().contains("occupied"));
    }

    #[test]
    fn test_validate_rejects_spectator_and_unknown_action() {
        let state = TicTacToe::setup(2);
        let r = TicTacToe::validate(&state, None, &mv(0, 0));
        assert!(r.unwrap_err().contains("not your turn"));
        let r = TicTacToe::validate(&state, Some(&seat("0")), &Action::new("UNDO", Value::Null));
        assert!(r.unwrap_err().contains("unknown action"));
    }

    #[test]
    fn test_win_detection_all_lines() {
        for row in 0..3 {
            let mut b = [[Cell::Empty; 3]; 3];
            for col in 0..3 { b[row][col] = Cell::X; }
            assert!(check_winner(&b, Cell::X), "row {row}");
        }
        for col in 0..3 {
            let mut b = [[Cell::Empty; 3]; 3];
            for row in 0..3 { b[row][col] = Cell::O; }
            assert!(check_winner(&b, Cell::O), "col {col}");
        }
        let mut b = [[Cell::Empty; 3]; 3];
        for i in 0..3 { b[i][i] = Cell::X; }
        assert!(check_winner(&b, Cell::X), "main diagonal");

        let mut b = [[Cell::Empty; 3]; 3];
        for i in 0..3 { b[i][2 - i] = Cell::O; }
        assert!(check_winner(&b, Cell::O), "anti-diagonal");
    }
}

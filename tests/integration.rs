// Integration tests (native) for the `tap-tiles` crate.
// These drive a full session through the deterministic scheduler and the
// in-memory store, so they run under `cargo test` on the host.

use std::cell::RefCell;
use std::rc::Rc;

use tap_tiles::persistence::Call;
use tap_tiles::{
    EndReason, EngineConfig, FixedStepScheduler, FrameControl, FrameOutcome, FrameScheduler, GameSession,
    MemoryPersistence, Phase, ScreenPoint, StartOutcome, Surface, TapOutcome, TileState, ViewportRect,
};

type Session = GameSession<Rc<MemoryPersistence>>;

const SURFACE: Surface = Surface { width: 415.0, height: 400.0 };
const VIEW: ViewportRect = ViewportRect { left: 0.0, top: 0.0, width: 415.0, height: 400.0 };

fn shared_session(tickets: u32) -> (Rc<RefCell<Session>>, Rc<MemoryPersistence>) {
    let store = Rc::new(MemoryPersistence::new().with_user("kit", 10, tickets));
    let mut session = GameSession::new(EngineConfig::desktop(), "kit", store.clone(), 7).unwrap();
    session.load_wallet(store.user_data("kit"));
    (Rc::new(RefCell::new(session)), store)
}

fn run_frames(session: &Rc<RefCell<Session>>, scheduler: &mut FixedStepScheduler) {
    let s = session.clone();
    scheduler.request_tick(Box::new(move |now| match s.borrow_mut().frame(now) {
        FrameOutcome::Running => FrameControl::Continue,
        FrameOutcome::Ended(_) | FrameOutcome::Inactive => FrameControl::Stop,
    }));
}

fn lowest_falling_centre(session: &Session) -> ScreenPoint {
    let tile = session
        .board()
        .unwrap()
        .tiles()
        .iter()
        .filter(|t| t.state == TileState::Falling)
        .max_by(|a, b| a.y.total_cmp(&b.y))
        .unwrap();
    ScreenPoint::new(tile.x + tile.width / 2.0, tile.bottom() - 1.0)
}

#[test]
fn fall_through_ends_run_and_saves_score_once() {
    let (session, store) = shared_session(3);
    assert!(matches!(session.borrow_mut().start(0.0, SURFACE).unwrap(), StartOutcome::Started { .. }));

    let mut scheduler = FixedStepScheduler::new(0.0, 16.0, 1_000);
    run_frames(&session, &mut scheduler);

    let s = session.borrow();
    assert_eq!(s.phase(), Phase::Over);
    assert!(matches!(s.game_over().unwrap().reason, EndReason::TileMissed(_)));
    assert!(scheduler.frames_run() < 1_000);
    assert_eq!(store.finalize_calls(), vec![0]);
    assert_eq!(
        store.calls(),
        vec![
            Call::ConsumeTicket { username: "kit".into(), remaining: 2 },
            Call::FinalizeScore { username: "kit".into(), score: 0 },
        ]
    );
}

#[test]
fn fall_through_saves_the_score_reached_so_far() {
    let (session, store) = shared_session(3);
    session.borrow_mut().start(0.0, SURFACE).unwrap();
    let mut scheduler = FixedStepScheduler::new(0.0, 16.0, 40);
    run_frames(&session, &mut scheduler);

    let hit = {
        let mut s = session.borrow_mut();
        let point = lowest_falling_centre(&s);
        s.tap(point, VIEW)
    };
    assert_eq!(hit, TapOutcome::Hit { score: 1 });

    // no more taps: the next tile eventually drops out of the bottom
    scheduler.max_frames = 1_000;
    run_frames(&session, &mut scheduler);

    let s = session.borrow();
    assert_eq!(s.phase(), Phase::Over);
    assert!(matches!(s.game_over().unwrap().reason, EndReason::TileMissed(_)));
    assert_eq!(s.game_over().unwrap().score, 1);
    assert!(scheduler.frames_run() < 1_040);
    assert_eq!(store.finalize_calls(), vec![1]);
}

#[test]
fn loop_stops_after_empty_tap() {
    let (session, store) = shared_session(3);
    session.borrow_mut().start(0.0, SURFACE).unwrap();
    let mut scheduler = FixedStepScheduler::new(0.0, 16.0, 40);
    run_frames(&session, &mut scheduler);
    assert_eq!(scheduler.frames_run(), 40);

    let hit = {
        let mut s = session.borrow_mut();
        let point = lowest_falling_centre(&s);
        s.tap(point, VIEW)
    };
    assert_eq!(hit, TapOutcome::Hit { score: 1 });

    let miss = session.borrow_mut().tap(ScreenPoint::new(-1.0, -1.0), VIEW);
    assert_eq!(miss, TapOutcome::Ended(EndReason::TappedEmptySpace));

    // the next frame sees the session over and stops the loop at once
    run_frames(&session, &mut scheduler);
    assert_eq!(scheduler.frames_run(), 41);
    assert_eq!(store.finalize_calls(), vec![1]);
    assert_eq!(store.top_users()[0].points, 1);
}

#[test]
fn zero_tickets_never_reaches_the_store() {
    let (session, store) = shared_session(0);
    assert_eq!(session.borrow_mut().start(0.0, SURFACE).unwrap(), StartOutcome::NoTickets);
    let mut scheduler = FixedStepScheduler::new(0.0, 16.0, 10);
    run_frames(&session, &mut scheduler);
    assert_eq!(scheduler.frames_run(), 1);
    assert_eq!(session.borrow().phase(), Phase::Idle);
    assert!(store.calls().is_empty());
}

#[test]
fn each_run_starts_fresh() {
    let (session, store) = shared_session(2);
    for expected_remaining in [1, 0] {
        let mut s = session.borrow_mut();
        assert_eq!(
            s.start(0.0, SURFACE).unwrap(),
            StartOutcome::Started { remaining_tickets: expected_remaining }
        );
        assert_eq!(s.score(), 0);
        assert_eq!(s.speed(), Some(2.0));
        assert_eq!(s.board().unwrap().active_count(), 4);
        s.tap(ScreenPoint::new(-1.0, -1.0), VIEW);
        assert!(s.dismiss());
    }
    assert_eq!(session.borrow_mut().start(0.0, SURFACE).unwrap(), StartOutcome::NoTickets);
    assert_eq!(store.finalize_calls(), vec![0, 0]);
    assert_eq!(store.user_data("kit").tickets, 0);
}

#[test]
fn mobile_user_agent_gets_mobile_tuning() {
    let ua = "Mozilla/5.0 (Linux; Android 14) Mobile Safari";
    let cfg = EngineConfig::from_json(r#"{"hold_duration_ms": 800}"#, ua).unwrap();
    assert_eq!(cfg.base_speed, 6.0);
    assert_eq!(cfg.speed_increment, 0.005);
    assert_eq!(cfg.hold_duration_ms, 800.0);

    let forced = EngineConfig::from_json(r#"{"preset": "desktop"}"#, ua).unwrap();
    assert_eq!(forced, EngineConfig::desktop());
}

//! Folio demo: two editors sharing one document.
//!
//! Runs a scripted session between two users on an in-process room and
//! logs each step. Set `RUST_LOG=debug` to watch the sync engine.

mod state;

use folio_core::{BlockId, Node, NodeKind, NodeProperties};
use folio_sync::{BlockPresence, DocumentSession, SessionConfig, SyncError, YrsList};
use log::info;
use state::DemoState;
use uuid::Uuid;

fn main() -> Result<(), SyncError> {
    env_logger::init();

    info!("Starting Folio demo...");
    let mut demo = DemoState::new()?;
    log_outline(&demo, "opened");

    demo.edit_alice(|editor| {
        editor.set_text(&[0, 0], "Meeting notes")?;
        editor.insert_block(1, Node::paragraph("Agenda and decisions"))?;
        editor.insert_block(2, Node::block(NodeKind::ToDo, "Book a room"))
    })?;
    log_outline(&demo, "alice wrote an outline");

    // Return at the end of the paragraph starts a new block with a fresh id.
    demo.edit_bob(|editor| {
        editor.set_caret(vec![1, 0], "Agenda and decisions".len())?;
        editor.insert_break()?;
        editor.set_text(&[2, 0], "Budget review")
    })?;
    log_outline(&demo, "bob split a block");

    demo.edit_alice(|editor| editor.move_block(3, 1))?;
    log_outline(&demo, "alice moved the todo up");

    demo.edit_bob(|editor| {
        editor.set_block(
            1,
            NodeProperties::default().with_attribute("checked", true),
        )
    })?;
    demo.edit_alice(|editor| editor.set_caret(vec![2, 0], 0))?;

    let selected = demo.alice.document().children[2].id.clone();
    if let Some(id) = selected.as_ref() {
        log_presence(&demo, id);
    }

    let alice = demo.alice.stats().clone();
    let bob = demo.bob.stats().clone();
    info!("alice: {alice:?}");
    info!("bob: {bob:?}");
    info!("converged: {}", demo.converged());

    let document = demo.alice.close();
    info!("final document has {} blocks", document.len());

    yrs_round_trip()
}

/// The same flow over `yrs` documents exchanging encoded updates.
fn yrs_round_trip() -> Result<(), SyncError> {
    info!("── yrs peers");
    let mut left = DocumentSession::open(
        SessionConfig::default(),
        YrsList::new(Uuid::new_v4()),
        Vec::<BlockPresence>::new(),
    )?;

    let mut right_list = YrsList::new(Uuid::new_v4());
    right_list.apply_update(&left.remote_mut().take_update())?;
    let mut right = DocumentSession::open(
        SessionConfig::default(),
        right_list,
        Vec::<BlockPresence>::new(),
    )?;

    left.edit(|editor| {
        editor.insert_block(1, Node::paragraph("first on the left"))?;
        editor.insert_block(2, Node::paragraph("second on the left"))
    })?;
    let update = left.remote_mut().take_update();
    info!("shipping {} byte update", update.len());
    right.remote_mut().apply_update(&update)?;
    right.pump_remote()?;

    right.edit(|editor| editor.move_block(2, 1))?;
    let update = right.remote_mut().take_update();
    left.remote_mut().apply_update(&update)?;
    left.pump_remote()?;

    info!(
        "yrs peers converged: {}",
        left.document().children == right.document().children
    );
    Ok(())
}

fn log_outline(demo: &DemoState, step: &str) {
    info!("── {step}");
    for line in DemoState::outline(&demo.bob) {
        info!("   {line}");
    }
}

fn log_presence(demo: &DemoState, block: &BlockId) {
    let users = demo.bob.presence().users_on_block(block);
    info!("bob sees {} peer(s) on block {block}", users.len());
}

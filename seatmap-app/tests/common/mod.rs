//! Shared fixtures for seat map integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

use seatmap_app::{SeatMap, SeatMapConfig, SeatMapListener};
use seatmap_core::{GroupId, Seat, SeatGroup, SeatId};

/// Show id the fixtures load.
pub const SHOW: &str = "show-1";

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn push_row(svg: &mut String, prefix: &str, row: u32, count: u32, seat_type: &str) {
    for p in 1..=count {
        let _ = write!(
            svg,
            r#"<rect data-seat-id="{prefix}-{row}-{p}" data-type="{seat_type}" data-row="{row}" data-row-position="{p}" x="{x}" y="{y}" width="8" height="8"/>"#,
            x = p * 10,
            y = row * 12,
        );
    }
}

/// Two parkett rows (86 and 88 seats), four wheelchair spaces in row 5
/// and a companion seat linked to `W-5-1`.
///
/// Seat `P-r-p` covers world `(10p, 12r)` to `(10p + 8, 12r + 8)`.
pub fn hall_svg() -> String {
    let mut svg = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg">"#);

    svg.push_str(r##"<g data-group="parkett" fill="#4e79a7">"##);
    push_row(&mut svg, "P", 1, 86, "normal");
    push_row(&mut svg, "P", 2, 88, "normal");
    svg.push_str("</g>");

    svg.push_str(r##"<g data-group="rollstuhl" fill="#59a14f">"##);
    push_row(&mut svg, "W", 5, 4, "wheelchair");
    svg.push_str(
        r#"<rect data-seat-id="B-5-1" data-type="wheelchair_accompaniment" data-row="B5" data-row-position="1" data-linked-seat-id="W-5-1" x="100" y="60" width="8" height="8"/>"#,
    );
    svg.push_str("</g></svg>");
    svg
}

/// Parkett and wheelchair groups.
pub fn groups() -> Vec<SeatGroup> {
    vec![
        SeatGroup::new("parkett", "Parkett").with_color("#4e79a7"),
        SeatGroup::new("rollstuhl", "Rollstuhlplätze").with_color("#59a14f"),
    ]
}

/// Seat ids from string literals.
pub fn ids(raw: &[&str]) -> Vec<SeatId> {
    raw.iter().map(|s| SeatId::from(*s)).collect()
}

/// Everything a [`Recorder`] saw.
#[derive(Debug, Default)]
pub struct Recorded {
    pub selected: Vec<(SeatId, Option<GroupId>)>,
    pub deselected: Vec<SeatId>,
    pub parsed: Vec<usize>,
}

/// Listener that appends every callback to shared state.
pub struct Recorder(pub Rc<RefCell<Recorded>>);

impl SeatMapListener for Recorder {
    fn on_seat_selected(&mut self, seat_id: &SeatId, group_id: Option<&GroupId>, _seat: &Seat) {
        self.0
            .borrow_mut()
            .selected
            .push((seat_id.clone(), group_id.cloned()));
    }

    fn on_seat_deselected(&mut self, seat_id: &SeatId) {
        self.0.borrow_mut().deselected.push(seat_id.clone());
    }

    fn on_seats_parsed(&mut self, seats: &[Seat]) {
        self.0.borrow_mut().parsed.push(seats.len());
    }
}

/// A loaded 800x600 seat map with a recording listener.
pub fn loaded_map() -> (SeatMap, Rc<RefCell<Recorded>>) {
    init_tracing();
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut map = SeatMap::new(SeatMapConfig::default()).expect("seat map");
    map.set_listener(Box::new(Recorder(Rc::clone(&recorded))));
    map.load(SHOW, &hall_svg(), groups()).expect("load");
    (map, recorded)
}

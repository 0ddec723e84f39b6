use studio_room::RoomLayout;

fn main() -> anyhow::Result<()> {
    let layout = match std::env::args().nth(1) {
        Some(path) => RoomLayout::load(path)?,
        None => RoomLayout::default(),
    };
    studio_room::run(layout)
}

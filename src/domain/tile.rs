/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Ground,   // Solid block
    Platform, // Solid ledge, drawn thinner
    Flag,     // Finish marker (passable)
}

impl Tile {
    /// Does this tile block the player's box?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Ground | Tile::Platform)
    }

    pub fn from_char(c: char) -> Tile {
        match c {
            '#' => Tile::Ground,
            '=' => Tile::Platform,
            'F' => Tile::Flag,
            _ => Tile::Empty,
        }
    }
}

/// Read-only view of a tile grid. Out-of-bounds columns are solid walls;
/// rows above the map are open sky and rows below are empty (a pit).
#[derive(Clone, Copy)]
pub struct TileMap<'a> {
    pub tiles: &'a [Vec<Tile>],
    pub width: usize,
    pub height: usize,
}

impl<'a> TileMap<'a> {
    pub fn new(tiles: &'a [Vec<Tile>]) -> Self {
        let height = tiles.len();
        let width = tiles.first().map_or(0, |row| row.len());
        TileMap { tiles, width, height }
    }

    pub fn at(&self, x: i32, y: i32) -> Tile {
        if x < 0 || x as usize >= self.width {
            return Tile::Ground;
        }
        if y < 0 || y as usize >= self.height {
            return Tile::Empty;
        }
        self.tiles[y as usize]
            .get(x as usize)
            .copied()
            .unwrap_or(Tile::Empty)
    }

    pub fn solid(&self, x: i32, y: i32) -> bool {
        self.at(x, y).is_solid()
    }
}

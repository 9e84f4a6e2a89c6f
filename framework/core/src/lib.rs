mod fs;

pub mod prelude {
    pub use crate::fs::write_atomic;
}

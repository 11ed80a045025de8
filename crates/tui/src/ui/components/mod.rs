pub mod hints;

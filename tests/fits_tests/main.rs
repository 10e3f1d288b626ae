//! Compressed column file codec tests

mod tile_tests;

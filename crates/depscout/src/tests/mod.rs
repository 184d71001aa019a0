mod analyzer_tests;
mod walker_tests;

#[cfg(test)]
mod graph_tests;

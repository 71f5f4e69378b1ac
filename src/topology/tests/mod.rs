mod debug_invariants;
mod mutate_tests;
mod validation_tests;

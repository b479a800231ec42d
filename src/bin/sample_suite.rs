// Fixed three-test suite exercising the report contract end to end:
// one failing test between two passing ones.
// Usage: cargo run --bin sample_suite

use std::process::ExitCode;

use attest::{check, check_true, test_case};

test_case! {
    fn sample_a() {
        println!("sample_a ran");
        check!(1 + 1 == 2);
    }
}

test_case! {
    fn sample_b() {
        let x = 0;
        check!(x > 0);
        println!("unreachable after the failing check");
    }
}

test_case! {
    fn sample_c() {
        check_true!(true);
    }
}

fn main() -> ExitCode {
    attest::harness_main()
}

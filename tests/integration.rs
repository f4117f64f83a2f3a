// Integration tests module

mod integration {
    mod adb_test;
    mod process_test;
    mod pty_test;
    mod shell_test;
    mod telemetry_test;
}

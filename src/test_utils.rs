//! Test-only Hack CPU: assembles symbolic output and runs it.

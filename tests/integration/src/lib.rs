//! End-to-end tests for the OTP sync request pipeline live under `tests/`.

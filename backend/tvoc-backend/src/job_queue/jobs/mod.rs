pub mod expire_broken_streaks;

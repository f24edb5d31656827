mod pager;

pub use pager::PagerScreen;

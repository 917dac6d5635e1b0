mod session;

pub use session::HttpSession;

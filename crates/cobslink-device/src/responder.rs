use cobslink_frame::Message;

/// Produces exactly one reply per decoded request.
///
/// The reply is written back unmodified. Implementations decide what an
/// unexpected request gets; the framing layer never sees it.
pub trait Responder {
    fn respond(&mut self, request: &Message) -> Message;
}

impl<F> Responder for F
where
    F: FnMut(&Message) -> Message,
{
    fn respond(&mut self, request: &Message) -> Message {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_responders() {
        let mut calls = 0;
        let mut echo = |request: &Message| {
            calls += 1;
            request.clone()
        };
        assert_eq!(echo.respond(&Message::from("x")), Message::from("x"));
        assert_eq!(echo.respond(&Message::Null), Message::Null);
        assert_eq!(calls, 2);
    }
}

mod poller;
mod support;

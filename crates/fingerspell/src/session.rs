//! Per-client frame streams processed on a dedicated thread.

use std::{
    io,
    panic::resume_unwind,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, Sender};

use crate::{
    image::Image,
    pipeline::{FramePipeline, FrameResult, Stream},
    timer::FpsCounter,
};

/// Creates a connected pair of [`Promise`] and [`PromiseHandle`].
pub fn promise<T>() -> (Promise<T>, PromiseHandle<T>) {
    // Capacity 1 makes `Promise::fulfill` non-blocking.
    let (sender, recv) = channel::bounded(1);
    (Promise { inner: sender }, PromiseHandle { recv })
}

/// An empty slot that can be filled with a `T`, fulfilling the promise.
pub struct Promise<T> {
    inner: Sender<T>,
}

impl<T> Promise<T> {
    /// Fulfills the promise with a value, consuming it.
    ///
    /// This never blocks. If the connected [`PromiseHandle`] was dropped, `value` is dropped.
    pub fn fulfill(self, value: T) {
        self.inner.send(value).ok();
    }
}

/// A handle connected to a [`Promise`] that will eventually resolve to a value of type `T`.
pub struct PromiseHandle<T> {
    recv: Receiver<T>,
}

impl<T> PromiseHandle<T> {
    /// Blocks the calling thread until the [`Promise`] is fulfilled.
    ///
    /// Fails if the [`Promise`] was dropped without being fulfilled, which happens when the thread
    /// that was supposed to fulfill it has panicked. The panic itself is propagated when the owning
    /// [`Session`] is dropped.
    pub fn block(self) -> Result<T, PromiseDropped> {
        self.recv.recv().map_err(|_| PromiseDropped { _priv: () })
    }

    /// Returns whether the associated [`Promise`] has been fulfilled.
    ///
    /// If this returns `true`, [`PromiseHandle::block`] will return immediately.
    pub fn is_fulfilled(&self) -> bool {
        !self.recv.is_empty()
    }
}

/// The [`Promise`] connected to a [`PromiseHandle`] was dropped without being fulfilled.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("promise dropped without being fulfilled")]
pub struct PromiseDropped {
    _priv: (),
}

enum Message {
    Frame(Image, Promise<anyhow::Result<FrameResult>>),
    Reset,
}

/// A stream of frames from one client.
///
/// Each session runs a [`FramePipeline`] on its own thread, together with the state of the stream
/// (see [`Stream`]). Frames are processed strictly in the order they are submitted.
///
/// When dropped, the session's channel is closed and the thread is joined after it has processed
/// all queued frames. If the thread has panicked, the panic is forwarded to the thread dropping
/// the [`Session`].
pub struct Session {
    sender: Option<Sender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    /// Spawns a session thread called `name` that processes frames with `pipeline`.
    ///
    /// At most `capacity` frames are queued. With a capacity of 0, [`Session::submit`] blocks until
    /// the thread has picked up the frame.
    pub fn spawn<N: Into<String>>(
        name: N,
        pipeline: FramePipeline,
        capacity: usize,
    ) -> io::Result<Self> {
        let name = name.into();
        let (sender, recv) = channel::bounded(capacity);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(name, pipeline, recv))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queues `image` for processing.
    ///
    /// Blocks while the queue is full. The returned handle resolves to the result of processing
    /// the frame.
    ///
    /// If the session thread has panicked, this will propagate the panic to the calling thread.
    pub fn submit(&mut self, image: Image) -> PromiseHandle<anyhow::Result<FrameResult>> {
        let (promise, handle) = promise();
        self.send(Message::Frame(image, promise));
        handle
    }

    /// Forgets the smoothing history and the tracked hand, as if the stream was restarted.
    ///
    /// Frames submitted before the reset are still processed with the old state.
    pub fn reset(&mut self) {
        self.send(Message::Reset);
    }

    fn send(&mut self, msg: Message) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(msg).is_err() {
            self.wait_for_exit();
        }
    }

    fn wait_for_exit(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                if !thread::panicking() {
                    resume_unwind(payload);
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closing the channel makes the thread exit.
        drop(self.sender.take());

        self.wait_for_exit();
    }
}

fn run(name: String, pipeline: FramePipeline, recv: Receiver<Message>) {
    log::trace!("session '{}' starting", name);
    let mut stream = pipeline.stream();
    let mut fps = FpsCounter::new(name.as_str());

    for message in recv {
        match message {
            Message::Frame(image, promise) => {
                let result = pipeline.process(&image, &mut stream);
                if let Err(e) = &result {
                    log::debug!("session '{}': {:#}", name, e);
                }
                promise.fulfill(result);
                fps.tick_with(pipeline.timers());
            }
            Message::Reset => {
                log::debug!("session '{}' reset", name);
                stream.reset();
            }
        }
    }

    log::trace!("session '{}' exiting", name);
}

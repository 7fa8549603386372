use crate::conversion::ConversionHandler;

pub(crate) struct ApiServerState {
    pub(crate) conversion_handler: ConversionHandler,
}
